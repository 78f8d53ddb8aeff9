// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Errors raised by [`crate::ScimClient`].
///
/// A SCIM provider answering with a 4xx or 5xx status is *not* an error here:
/// that comes back as an ordinary [`crate::ScimResponse`] for the caller to
/// inspect.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Missing or unusable base URL or token. Raised while constructing the
    /// client, never by a request.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// DNS, connect, timeout, or body read failures
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A resource id that can't be used as a single path segment
    #[error("invalid resource id: {0:?}")]
    InvalidId(String),

    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}
