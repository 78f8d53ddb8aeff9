// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

#[derive(Deserialize, Clone, Debug)]
pub struct CreateGroupRequest {
    pub display_name: String,

    /// Generated when absent or empty, see [`generate_group_external_id`]
    pub external_id: Option<String>,
}

impl CreateGroupRequest {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self { display_name: display_name.into(), external_id: None }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn into_group(self) -> Group {
        let external_id = self
            .external_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(generate_group_external_id);

        Group {
            schemas: vec![GROUP_URN.to_string()],
            display_name: Some(self.display_name),
            external_id: Some(external_id),
            ..Default::default()
        }
    }
}

/// The SCIM Group resource. As with [`User`], attributes that aren't modeled
/// are carried in `extra`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<GroupMember>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Group {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.members
            .iter()
            .flatten()
            .any(|member| member.value.as_deref() == Some(user_id))
    }

    pub fn member_count(&self) -> usize {
        self.members.as_ref().map_or(0, Vec::len)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct GroupMember {
    /// The member's resource id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl GroupMember {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: Some(value.into()), ..Default::default() }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_group_payload() {
        let group = CreateGroupRequest::new("Sales Reps")
            .with_external_id("sales_reps")
            .into_group();

        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            json!({
                "schemas": ["urn:ietf:params:scim:schemas:core:2.0:Group"],
                "displayName": "Sales Reps",
                "externalId": "sales_reps"
            })
        );
    }

    #[test]
    fn test_group_members() {
        let group: Group = serde_json::from_value(json!({
            "id": "e9e30dba",
            "displayName": "Accounting",
            "members": [
                {
                    "value": "2819c223",
                    "display": "kmalone",
                    "$ref": "https://example.com/v2/Users/2819c223"
                }
            ]
        }))
        .unwrap();

        assert!(group.has_member("2819c223"));
        assert!(!group.has_member("902c246b"));
        assert_eq!(group.member_count(), 1);

        let members = group.members.as_ref().unwrap();
        assert_eq!(
            members[0].extra["$ref"],
            json!("https://example.com/v2/Users/2819c223")
        );
    }
}
