// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

/// A provider response, handed back as received. Nothing here decides
/// whether the call "worked"; see [`ScimResponse::is_success`] for the one
/// convention this crate applies.
#[derive(Debug, Clone)]
pub struct ScimResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl ScimResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: String) -> Self {
        Self { status, headers, body }
    }

    /// Drain a blocking response. Only fails if reading the body fails.
    pub(crate) fn read(
        response: reqwest::blocking::Response,
    ) -> Result<Self, reqwest::Error> {
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes()?;

        Ok(Self {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Anything below 400 counts as success.
    pub fn is_success(&self) -> bool {
        self.status_code() < 400
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    pub fn json_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        self.json()
    }

    /// The body as JSON if it parses, otherwise the raw text as a JSON string.
    pub fn data(&self) -> serde_json::Value {
        self.json_value()
            .unwrap_or_else(|_| serde_json::Value::String(self.body.clone()))
    }
}

/// The generic response used to return a list of resources
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ListResponse<R> {
    #[serde(default)]
    pub schemas: Vec<String>,

    #[serde(rename = "totalResults", default)]
    pub total_results: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "startIndex", default)]
    pub start_index: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "itemsPerPage", default)]
    pub items_per_page: Option<usize>,

    // Providers are allowed to leave this out when there are no results.
    #[serde(rename = "Resources", default)]
    pub resources: Vec<R>,
}

impl<R> ListResponse<R> {
    /// One page of a larger result set.
    pub fn page(
        resources: Vec<R>,
        start_index: usize,
        total_results: usize,
    ) -> Self {
        Self {
            schemas: vec![LISTRESPONSE_URN.to_string()],
            total_results,
            start_index: Some(start_index),
            items_per_page: Some(resources.len()),
            resources,
        }
    }
}
