// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

/// What a caller supplies to create a user. The email doubles as the
/// `userName`.
#[derive(Deserialize, Clone, Debug)]
pub struct CreateUserRequest {
    pub email: String,

    pub first_name: String,

    pub last_name: String,

    /// Generated when absent or empty, see [`generate_external_id`]
    pub external_id: Option<String>,

    /// Generated when absent or empty, see [`generate_password`]
    pub password: Option<String>,
}

impl CreateUserRequest {
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            external_id: None,
            password: None,
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Build the full SCIM user payload, filling in any missing externalId or
    /// password.
    pub fn into_user(self) -> User {
        let CreateUserRequest {
            email,
            first_name,
            last_name,
            external_id,
            password,
        } = self;

        let external_id = external_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(generate_external_id);

        let password = password
            .filter(|p| !p.is_empty())
            .unwrap_or_else(generate_password);

        User {
            schemas: vec![USER_URN.to_string()],
            id: None,
            user_name: Some(email.clone()),
            external_id: Some(external_id),
            name: Some(Name {
                given_name: Some(first_name),
                family_name: Some(last_name),
                extra: Extra::new(),
            }),
            emails: Some(vec![Email {
                value: Some(email),
                primary: Some(true),
                extra: Extra::new(),
            }]),
            password: Some(password),
            active: Some(true),
            meta: None,
            extra: Extra::new(),
        }
    }
}

/// The SCIM User resource, narrowed to the attributes this crate reads or
/// writes. Everything else lands in `extra` and is written back out
/// unchanged, so a body fetched with GET can be edited and sent back with PUT.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<String>,

    /// Assigned by the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    /// An identifier for the resource as defined by the provisioning client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Name>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub emails: Option<Vec<Email>>,

    /// Write-only; providers never return it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    /// Assigned by the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl User {
    /// The primary email, or the first one listed if none is marked primary.
    pub fn primary_email(&self) -> Option<&str> {
        let emails = self.emails.as_ref()?;

        emails
            .iter()
            .find(|email| email.primary == Some(true))
            .or_else(|| emails.first())
            .and_then(|email| email.value.as_deref())
    }

    /// "Given Family", skipping whichever half is missing.
    pub fn full_name(&self) -> Option<String> {
        let name = self.name.as_ref()?;

        let parts: Vec<&str> = [&name.given_name, &name.family_name]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect();

        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Name {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Email {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,

    #[serde(flatten)]
    pub extra: Extra,
}
