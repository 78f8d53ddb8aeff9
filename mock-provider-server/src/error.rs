// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

/// The SCIM error types specified in RFC 7644, section 3.12
#[derive(Deserialize, Serialize, JsonSchema, Debug, PartialEq)]
pub enum ErrorType {
    #[serde(rename = "invalidFilter")]
    InvalidFilter,

    #[serde(rename = "invalidSyntax")]
    InvalidSyntax,

    #[serde(rename = "invalidPath")]
    InvalidPath,

    #[serde(rename = "uniqueness")]
    Uniqueness,
}

/// The SCIM error format is specified in RFC 7644, section 3.12
#[derive(Deserialize, Serialize, JsonSchema, Debug)]
pub struct ScimError {
    pub schemas: Vec<String>,

    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "scimType")]
    pub error_type: Option<ErrorType>,

    pub detail: String,
}

impl ScimError {
    fn new(
        status: StatusCode,
        error_type: Option<ErrorType>,
        detail: String,
    ) -> Self {
        Self {
            schemas: vec![ERROR_URN.to_string()],
            status: status.as_str().to_string(),
            error_type,
            detail,
        }
    }

    pub fn invalid_filter(detail: String) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            Some(ErrorType::InvalidFilter),
            detail,
        )
    }

    pub fn invalid_syntax(detail: String) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            Some(ErrorType::InvalidSyntax),
            detail,
        )
    }

    pub fn invalid_path(detail: String) -> Self {
        Self::new(StatusCode::BAD_REQUEST, Some(ErrorType::InvalidPath), detail)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            None,
            String::from("missing or invalid bearer token"),
        )
    }

    pub fn not_found(id: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            None,
            format!("Resource {id} not found"),
        )
    }

    pub fn conflict(identifier: String) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            Some(ErrorType::Uniqueness),
            format!("Resource matching {identifier} exists already"),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
            .parse::<u16>()
            .ok()
            .and_then(|status| StatusCode::from_u16(status).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn to_http_response(self) -> Result<Response<Body>, http::Error> {
        let status = self.status();
        json_response(status, &self)
    }
}

impl From<PatchRequestError> for ScimError {
    fn from(error: PatchRequestError) -> Self {
        match error {
            PatchRequestError::Invalid(detail) => {
                ScimError::invalid_syntax(detail)
            }

            PatchRequestError::Unsupported(detail) => {
                ScimError::invalid_path(detail)
            }
        }
    }
}

/// Serialize `body` as a SCIM JSON response, falling back to a 500 error
/// body if that fails.
pub fn json_response<T: Serialize>(
    status: StatusCode,
    body: &T,
) -> Result<Response<Body>, http::Error> {
    match serde_json::to_string(body) {
        Ok(serialized) => Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, SCIM_CONTENT_TYPE)
            .body(serialized.into()),

        Err(e) => Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .header(http::header::CONTENT_TYPE, SCIM_CONTENT_TYPE)
            .body(
                serde_json::json!({
                    "schemas": [ERROR_URN],
                    "status": "500",
                    "detail": format!("serializing response failed: {e}"),
                })
                .to_string()
                .into(),
            ),
    }
}

pub fn deleted_http_response() -> Result<Response<Body>, http::Error> {
    Response::builder().status(StatusCode::NO_CONTENT).body(Body::empty())
}
