// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

use std::str::FromStr;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum PatchRequestError {
    #[error("invalid patch request: {0}")]
    Invalid(String),

    #[error("unsupported patch request: {0}")]
    Unsupported(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "op")]
pub enum PatchOp {
    #[serde(rename = "add", alias = "Add")]
    Add {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        value: serde_json::Value,
    },
    #[serde(rename = "remove", alias = "Remove")]
    Remove {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<serde_json::Value>,
    },
    #[serde(rename = "replace", alias = "Replace")]
    Replace {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        value: serde_json::Value,
    },
}

/// The PatchOp message body, RFC 7644 § 3.5.2
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PatchRequest {
    pub schemas: Vec<String>,
    #[serde(rename = "Operations")]
    pub operations: Vec<PatchOp>,
}

impl PatchRequest {
    pub fn new(operations: Vec<PatchOp>) -> Self {
        Self { schemas: vec![PATCHOP_URN.to_string()], operations }
    }

    /// A single `add` of every id to `members`. An empty list still produces
    /// the operation (with an empty value).
    pub fn add_members<S: AsRef<str>>(user_ids: &[S]) -> Self {
        let members: Vec<serde_json::Value> = user_ids
            .iter()
            .map(|id| serde_json::json!({ "value": id.as_ref() }))
            .collect();

        Self::new(vec![PatchOp::Add {
            path: Some(String::from("members")),
            value: serde_json::Value::Array(members),
        }])
    }

    /// One `remove` per id, each targeting `members[value eq "<id>"]`.
    ///
    /// Providers differ in how they handle a single remove carrying several
    /// members, so every member gets its own operation.
    pub fn remove_members<S: AsRef<str>>(user_ids: &[S]) -> Self {
        let operations = user_ids
            .iter()
            .map(|id| PatchOp::Remove {
                path: member_value_path(id.as_ref()),
                value: None,
            })
            .collect();

        Self::new(operations)
    }

    /// Ensure that the parsed `PatchRequest` contains the expected schema
    /// field.
    pub fn validate_schema(&self) -> Result<(), PatchRequestError> {
        match matches!(&self.schemas[..], [val] if val == PATCHOP_URN) {
            true => Ok(()),
            false => Err(PatchRequestError::Invalid(format!(
                "invalid patch schema {:?}",
                self.schemas
            ))),
        }
    }
}

/// `members[value eq "<id>"]`
pub fn member_value_path(user_id: &str) -> String {
    format!("members[value eq \"{user_id}\"]")
}

/// The member paths a group PATCH can target.
#[derive(Debug, PartialEq)]
pub enum MemberPath {
    /// `members`
    All,
    /// `members[value eq "<id>"]`
    Individual(String),
}

impl FromStr for MemberPath {
    type Err = PatchRequestError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        const FILTER_PREFIX: &str = "members[value eq ";

        let path = path.trim();
        if path.eq_ignore_ascii_case("members") {
            return Ok(MemberPath::All);
        }

        let invalid = || {
            PatchRequestError::Invalid(format!(
                "member path {path} must be members or \
                members[value eq \"<id>\"]"
            ))
        };

        // Attribute names and the operator are case insensitive, the value
        // is not.
        let value = path
            .get(..FILTER_PREFIX.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(FILTER_PREFIX))
            .and_then(|_| path[FILTER_PREFIX.len()..].strip_suffix(']'))
            .ok_or_else(invalid)?;

        // The value portion of the expression must be a string wrapped in
        // quotations
        if value.len() > 2 && value.starts_with('"') && value.ends_with('"') {
            Ok(MemberPath::Individual(value[1..value.len() - 1].to_string()))
        } else {
            Err(invalid())
        }
    }
}
