// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

use std::time::Duration;

use reqwest::IntoUrl;
use reqwest::Method;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Request;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use slog::Logger;
use slog::debug;

pub const SCIM_CONTENT_TYPE: &str = "application/scim+json";

/// Applied to every request; there are no retries.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The largest page this client will ask for, whatever the caller wants.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination and filtering for the list endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    /// 1-based
    pub start_index: u32,

    /// Clamped to [`MAX_PAGE_SIZE`] when sent
    pub count: u32,

    /// A SCIM filter expression, passed through untouched
    pub filter: Option<String>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self { start_index: 1, count: MAX_PAGE_SIZE, filter: None }
    }
}

impl QueryParams {
    pub fn with_start_index(mut self, start_index: u32) -> Self {
        self.start_index = start_index;
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// The query string pairs, in the order they are sent. `filter` is left
    /// out entirely unless there is an expression to send.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("startIndex", self.start_index.to_string()),
            ("count", self.count.min(MAX_PAGE_SIZE).to_string()),
        ];

        if let Some(filter) = self.filter.as_deref().filter(|f| !f.is_empty())
        {
            pairs.push(("filter", filter.to_string()));
        }

        pairs
    }
}

/// A blocking SCIM 2.0 client for one provider.
///
/// Every method maps onto exactly one HTTP request. Whatever the provider
/// answers, including 4xx and 5xx, comes back as a [`ScimResponse`]; only
/// transport failures are errors.
pub struct ScimClient {
    log: Logger,
    base_url: String,
    headers: HeaderMap,
    debug: bool,
    client: Client,
}

impl ScimClient {
    pub fn new(log: Logger, config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = normalize_base_url(&config.base_url).to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration(String::from(
                "SCIM base URL is empty",
            )));
        }

        let parsed = Url::parse(&base_url).map_err(|e| {
            ClientError::Configuration(format!(
                "SCIM base URL {base_url:?} is not an absolute URL: {e}"
            ))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::Configuration(format!(
                "SCIM base URL {base_url:?} cannot have a path"
            )));
        }

        if config.token.is_empty() {
            return Err(ClientError::Configuration(String::from(
                "SCIM token is empty",
            )));
        }

        let authorization =
            HeaderValue::from_str(&format!("Bearer {}", config.token))
                .map_err(|e| {
                    ClientError::Configuration(format!(
                        "SCIM token is not a valid header value: {e}"
                    ))
                })?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(SCIM_CONTENT_TYPE),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(SCIM_CONTENT_TYPE));

        let client =
            Client::builder().timeout(REQUEST_TIMEOUT).build().map_err(|e| {
                ClientError::Configuration(format!(
                    "building HTTP client failed: {e}"
                ))
            })?;

        Ok(Self { log, base_url, headers, debug: config.debug, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The headers sent with every request
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Join `endpoint` onto the base URL with exactly one `/`.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// The URL of a single resource. `id` is always exactly one path
    /// segment: `/`, `?` and the like are percent-encoded, and ids that
    /// would be read as dot segments are refused.
    pub fn resource_url(
        &self,
        resource_type: ResourceType,
        id: &str,
    ) -> Result<Url, ClientError> {
        if matches!(id, "" | "." | "..") {
            return Err(ClientError::InvalidId(id.to_string()));
        }

        let mut url = Url::parse(&self.endpoint_url(resource_type.endpoint()))
            .map_err(|e| {
                ClientError::Configuration(format!(
                    "SCIM base URL is not an absolute URL: {e}"
                ))
            })?;

        url.path_segments_mut()
            .map_err(|()| {
                ClientError::Configuration(String::from(
                    "SCIM base URL cannot have a path",
                ))
            })?
            .push(id);

        Ok(url)
    }

    /// Issue one request. The payload, when present, is the JSON body; when
    /// absent no body is sent at all.
    pub fn request(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        payload: Option<&serde_json::Value>,
    ) -> Result<ScimResponse, ClientError> {
        self.execute(method, self.endpoint_url(endpoint), query, payload)
    }

    fn execute<U: IntoUrl>(
        &self,
        method: Method,
        url: U,
        query: &[(&str, String)],
        payload: Option<&serde_json::Value>,
    ) -> Result<ScimResponse, ClientError> {
        let mut builder =
            self.client.request(method, url).headers(self.headers.clone());

        if !query.is_empty() {
            builder = builder.query(query);
        }

        if let Some(payload) = payload {
            builder = builder.body(serde_json::to_vec(payload)?);
        }

        let request = builder.build()?;

        if self.debug {
            self.log_request(&request, payload);
        }

        let response = ScimResponse::read(self.client.execute(request)?)?;

        if self.debug {
            self.log_response(&response);
        }

        Ok(response)
    }

    fn log_request(
        &self,
        request: &Request,
        payload: Option<&serde_json::Value>,
    ) {
        debug!(self.log, "=== SCIM REQUEST ===");
        debug!(self.log, "Method: {}", request.method());
        debug!(self.log, "URL: {}", request.url());
        debug!(self.log, "Headers: {}", headers_to_json(request.headers()));

        if let Some(payload) = payload {
            debug!(self.log, "Payload: {}", pretty(payload));
        }
    }

    fn log_response(&self, response: &ScimResponse) {
        debug!(self.log, "=== SCIM RESPONSE ===");
        debug!(self.log, "Status Code: {}", response.status_code());
        debug!(
            self.log,
            "Response Headers: {}",
            headers_to_json(response.headers())
        );

        match response.json_value() {
            Ok(body) => debug!(self.log, "Response Body: {}", pretty(&body)),
            Err(_) => {
                debug!(self.log, "Response Body (raw): {}", response.text())
            }
        }
    }

    fn get(&self, url: Url) -> Result<ScimResponse, ClientError> {
        self.execute(Method::GET, url, &[], None)
    }

    fn send<U: IntoUrl, T: Serialize + ?Sized>(
        &self,
        method: Method,
        url: U,
        body: &T,
    ) -> Result<ScimResponse, ClientError> {
        let payload = serde_json::to_value(body)?;
        self.execute(method, url, &[], Some(&payload))
    }

    fn list(
        &self,
        resource_type: ResourceType,
        query_params: &QueryParams,
    ) -> Result<ScimResponse, ClientError> {
        self.request(
            Method::GET,
            resource_type.endpoint(),
            &query_params.to_pairs(),
            None,
        )
    }

    /// `GET /Users`
    pub fn get_users(
        &self,
        query_params: &QueryParams,
    ) -> Result<ScimResponse, ClientError> {
        self.list(ResourceType::User, query_params)
    }

    /// `GET /Users/{id}`
    pub fn get_user(&self, user_id: &str) -> Result<ScimResponse, ClientError> {
        self.get(self.resource_url(ResourceType::User, user_id)?)
    }

    /// `POST /Users`, generating an externalId and password if the request
    /// leaves them out.
    pub fn create_user(
        &self,
        request: CreateUserRequest,
    ) -> Result<ScimResponse, ClientError> {
        let user = request.into_user();
        let url = self.endpoint_url(ResourceType::User.endpoint());
        self.send(Method::POST, url, &user)
    }

    /// `PUT /Users/{id}` with `user` as the complete replacement. Nothing is
    /// merged or checked: leave out externalId and the provider may clear
    /// it. `user` is usually a [`User`], or a raw JSON object to be sent
    /// exactly as given.
    pub fn update_user<T: Serialize + ?Sized>(
        &self,
        user_id: &str,
        user: &T,
    ) -> Result<ScimResponse, ClientError> {
        let url = self.resource_url(ResourceType::User, user_id)?;
        self.send(Method::PUT, url, user)
    }

    /// `DELETE /Users/{id}`
    pub fn delete_user(
        &self,
        user_id: &str,
    ) -> Result<ScimResponse, ClientError> {
        let url = self.resource_url(ResourceType::User, user_id)?;
        self.execute(Method::DELETE, url, &[], None)
    }

    /// `GET /Groups`
    pub fn get_groups(
        &self,
        query_params: &QueryParams,
    ) -> Result<ScimResponse, ClientError> {
        self.list(ResourceType::Group, query_params)
    }

    /// `GET /Groups/{id}`
    pub fn get_group(
        &self,
        group_id: &str,
    ) -> Result<ScimResponse, ClientError> {
        self.get(self.resource_url(ResourceType::Group, group_id)?)
    }

    /// `POST /Groups`, generating an 8 digit externalId if the request leaves
    /// it out.
    pub fn create_group(
        &self,
        request: CreateGroupRequest,
    ) -> Result<ScimResponse, ClientError> {
        let group = request.into_group();
        let url = self.endpoint_url(ResourceType::Group.endpoint());
        self.send(Method::POST, url, &group)
    }

    /// `PUT /Groups/{id}` with `group` as the complete replacement, sent
    /// as-is like [`ScimClient::update_user`].
    pub fn update_group<T: Serialize + ?Sized>(
        &self,
        group_id: &str,
        group: &T,
    ) -> Result<ScimResponse, ClientError> {
        let url = self.resource_url(ResourceType::Group, group_id)?;
        self.send(Method::PUT, url, group)
    }

    /// `DELETE /Groups/{id}`
    pub fn delete_group(
        &self,
        group_id: &str,
    ) -> Result<ScimResponse, ClientError> {
        let url = self.resource_url(ResourceType::Group, group_id)?;
        self.execute(Method::DELETE, url, &[], None)
    }

    /// `PATCH /Groups/{id}` with the given operations wrapped in a PatchOp
    /// message.
    pub fn patch_group(
        &self,
        group_id: &str,
        operations: Vec<PatchOp>,
    ) -> Result<ScimResponse, ClientError> {
        self.send_patch(group_id, &PatchRequest::new(operations))
    }

    pub fn add_members_to_group<S: AsRef<str>>(
        &self,
        group_id: &str,
        user_ids: &[S],
    ) -> Result<ScimResponse, ClientError> {
        self.send_patch(group_id, &PatchRequest::add_members(user_ids))
    }

    pub fn remove_members_from_group<S: AsRef<str>>(
        &self,
        group_id: &str,
        user_ids: &[S],
    ) -> Result<ScimResponse, ClientError> {
        self.send_patch(group_id, &PatchRequest::remove_members(user_ids))
    }

    fn send_patch(
        &self,
        group_id: &str,
        request: &PatchRequest,
    ) -> Result<ScimResponse, ClientError> {
        let url = self.resource_url(ResourceType::Group, group_id)?;
        self.send(Method::PATCH, url, request)
    }
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn headers_to_json(headers: &HeaderMap) -> String {
    let map: serde_json::Map<String, serde_json::Value> = headers
        .iter()
        .map(|(name, value)| {
            let value = value.to_str().unwrap_or("<non-ascii header value>");
            (name.to_string(), serde_json::Value::from(value))
        })
        .collect();

    pretty(&serde_json::Value::Object(map))
}

#[cfg(test)]
mod test {
    use super::*;

    fn client(base_url: &str, token: &str) -> ScimClient {
        let log = Logger::root(slog::Discard, slog::o!());
        ScimClient::new(log, ClientConfig::new(base_url, token)).unwrap()
    }

    #[test]
    fn test_headers() {
        let client = client("https://api.example.com/scim/v2", "test-token");

        let headers = client.headers();
        assert_eq!(headers[AUTHORIZATION], "Bearer test-token");
        assert_eq!(headers[CONTENT_TYPE], "application/scim+json");
        assert_eq!(headers[ACCEPT], "application/scim+json");
        assert!(!client.debug());
    }

    #[test]
    fn test_endpoint_url_has_one_slash() {
        for base_url in [
            "https://api.example.com/scim/v2",
            "https://api.example.com/scim/v2/",
        ] {
            let client = client(base_url, "t");
            assert_eq!(client.base_url(), "https://api.example.com/scim/v2");

            for endpoint in ["Users/123", "/Users/123"] {
                assert_eq!(
                    client.endpoint_url(endpoint),
                    "https://api.example.com/scim/v2/Users/123"
                );
            }
        }
    }

    #[test]
    fn test_resource_url_is_one_segment() {
        let client = client("https://api.example.com/scim/v2/", "t");

        let url = client.resource_url(ResourceType::User, "2819c223").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/scim/v2/Users/2819c223"
        );

        let url = client
            .resource_url(ResourceType::User, "../Groups/abc")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/scim/v2/Users/..%2FGroups%2Fabc"
        );

        let url = client.resource_url(ResourceType::Group, "a b?c#d").unwrap();
        assert_eq!(url.path(), "/scim/v2/Groups/a%20b%3Fc%23d");
        assert_eq!(url.query(), None);

        for id in ["", ".", ".."] {
            assert!(matches!(
                client.resource_url(ResourceType::Group, id),
                Err(ClientError::InvalidId(_))
            ));
        }
    }

    #[test]
    fn test_empty_configuration_is_rejected() {
        let log = Logger::root(slog::Discard, slog::o!());

        let result = ScimClient::new(log.clone(), ClientConfig::new("", "t"));
        assert!(matches!(result, Err(ClientError::Configuration(_))));

        let result = ScimClient::new(log.clone(), ClientConfig::new("/", "t"));
        assert!(matches!(result, Err(ClientError::Configuration(_))));

        let result =
            ScimClient::new(log.clone(), ClientConfig::new("https://x", ""));
        assert!(matches!(result, Err(ClientError::Configuration(_))));

        let result = ScimClient::new(
            log.clone(),
            ClientConfig::new("https://x", "line\nbreak"),
        );
        assert!(matches!(result, Err(ClientError::Configuration(_))));

        let result =
            ScimClient::new(log, ClientConfig::new("idp.example.com/v2", "t"));
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[test]
    fn test_query_params() {
        assert_eq!(
            QueryParams::default().to_pairs(),
            vec![("startIndex", "1".to_string()), ("count", "100".to_string())]
        );

        let query_params = QueryParams::default()
            .with_start_index(201)
            .with_count(500)
            .with_filter("userName sw \"test\"");
        assert_eq!(
            query_params.to_pairs(),
            vec![
                ("startIndex", "201".to_string()),
                ("count", "100".to_string()),
                ("filter", "userName sw \"test\"".to_string()),
            ]
        );

        let query_params = QueryParams::default().with_count(5).with_filter("");
        assert_eq!(
            query_params.to_pairs(),
            vec![("startIndex", "1".to_string()), ("count", "5".to_string())]
        );
    }
}
