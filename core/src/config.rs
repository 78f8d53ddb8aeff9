// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

pub const BASE_URL_ENV: &str = "SCIM_BASE_URL";
pub const TOKEN_ENV: &str = "SCIM_TOKEN";
pub const DEBUG_ENV: &str = "DEBUG";

/// Everything a [`ScimClient`] needs, resolved once up front.
#[derive(Clone, PartialEq)]
pub struct ClientConfig {
    /// Absolute URL of the SCIM root, e.g. `https://idp.example.com/scim/v2`
    pub base_url: String,

    /// Sent as `Authorization: Bearer <token>`
    pub token: String,

    /// Log every request and response at debug level
    pub debug: bool,
}

// The token stays out of Debug output.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("debug", &self.debug)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), token: token.into(), debug: false }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Use `base_url` and `token` where given (and non-empty), and fall back
    /// to `lookup` for `SCIM_BASE_URL` / `SCIM_TOKEN` otherwise. The debug
    /// flag always comes from `lookup("DEBUG")`.
    pub fn resolve<F>(
        base_url: Option<String>,
        token: Option<String>,
        lookup: F,
    ) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |s: String| (!s.is_empty()).then_some(s);

        let Some(base_url) = base_url
            .and_then(non_empty)
            .or_else(|| lookup(BASE_URL_ENV).and_then(non_empty))
        else {
            return Err(ClientError::Configuration(format!(
                "SCIM base URL must be provided directly or via the \
                {BASE_URL_ENV} environment variable"
            )));
        };

        let Some(token) = token
            .and_then(non_empty)
            .or_else(|| lookup(TOKEN_ENV).and_then(non_empty))
        else {
            return Err(ClientError::Configuration(format!(
                "SCIM token must be provided directly or via the {TOKEN_ENV} \
                environment variable"
            )));
        };

        let debug = parse_debug_flag(lookup(DEBUG_ENV).as_deref());

        Ok(Self { base_url, token, debug })
    }

    /// [`ClientConfig::resolve`] against the process environment.
    pub fn from_env(
        base_url: Option<String>,
        token: Option<String>,
    ) -> Result<Self, ClientError> {
        Self::resolve(base_url, token, |key| std::env::var(key).ok())
    }
}

/// `true`, `1` and `yes` (any case) turn debug on. Anything else, including
/// no value at all, leaves it off.
pub fn parse_debug_flag(value: Option<&str>) -> bool {
    match value {
        Some(value) => ["true", "1", "yes"]
            .iter()
            .any(|truthy| value.eq_ignore_ascii_case(truthy)),

        None => false,
    }
}

/// Drop trailing slashes so that endpoint paths can be joined with a single
/// `/`.
pub fn normalize_base_url(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_explicit_values_win() {
        let config = ClientConfig::resolve(
            Some("https://explicit.example.com/v2".to_string()),
            Some("explicit-token".to_string()),
            env(&[
                (BASE_URL_ENV, "https://env.example.com/v2"),
                (TOKEN_ENV, "env-token"),
            ]),
        )
        .unwrap();

        assert_eq!(config.base_url, "https://explicit.example.com/v2");
        assert_eq!(config.token, "explicit-token");
        assert!(!config.debug);
    }

    #[test]
    fn test_falls_back_to_lookup() {
        let config = ClientConfig::resolve(
            None,
            Some(String::new()),
            env(&[
                (BASE_URL_ENV, "https://env.example.com/v2"),
                (TOKEN_ENV, "env-token"),
                (DEBUG_ENV, "YES"),
            ]),
        )
        .unwrap();

        assert_eq!(config.base_url, "https://env.example.com/v2");
        assert_eq!(config.token, "env-token");
        assert!(config.debug);
    }

    #[test]
    fn test_missing_base_url() {
        let err =
            ClientConfig::resolve(None, Some("token".to_string()), env(&[]))
                .unwrap_err();

        assert!(matches!(err, ClientError::Configuration(_)));
        assert!(err.to_string().contains(BASE_URL_ENV));
    }

    #[test]
    fn test_missing_token() {
        let err = ClientConfig::resolve(
            Some("https://example.com".to_string()),
            None,
            env(&[(TOKEN_ENV, "")]),
        )
        .unwrap_err();

        assert!(matches!(err, ClientError::Configuration(_)));
        assert!(err.to_string().contains(TOKEN_ENV));
    }

    #[test]
    fn test_parse_debug_flag() {
        for truthy in ["true", "TRUE", "True", "1", "yes", "Yes"] {
            assert!(parse_debug_flag(Some(truthy)), "{truthy}");
        }

        for falsy in ["false", "0", "no", "", "on", "y", " true"] {
            assert!(!parse_debug_flag(Some(falsy)), "{falsy}");
        }

        assert!(!parse_debug_flag(None));
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://example.com/v2/"),
            "https://example.com/v2"
        );
        assert_eq!(
            normalize_base_url("https://example.com/v2"),
            "https://example.com/v2"
        );
        assert_eq!(
            normalize_base_url("https://example.com/v2//"),
            "https://example.com/v2"
        );
    }

    #[test]
    fn test_debug_output_hides_token() {
        let config = ClientConfig::new("https://example.com", "sekrit");
        assert!(!format!("{config:?}").contains("sekrit"));
    }
}
