// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

use serde_json::Value;
use serde_json::json;

/// Every operation the [`crate::Dispatcher`] exposes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ToolName {
    ListUsers,
    GetUser,
    CreateUser,
    UpdateUser,
    DeleteUser,
    ListGroups,
    GetGroup,
    CreateGroup,
    UpdateGroup,
    DeleteGroup,
    AddUsersToGroup,
    RemoveUsersFromGroup,
}

const TOOL_PREFIX: &str = "scim_";

impl ToolName {
    pub const ALL: [ToolName; 12] = [
        ToolName::ListUsers,
        ToolName::GetUser,
        ToolName::CreateUser,
        ToolName::UpdateUser,
        ToolName::DeleteUser,
        ToolName::ListGroups,
        ToolName::GetGroup,
        ToolName::CreateGroup,
        ToolName::UpdateGroup,
        ToolName::DeleteGroup,
        ToolName::AddUsersToGroup,
        ToolName::RemoveUsersFromGroup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::ListUsers => "scim_list_users",
            ToolName::GetUser => "scim_get_user",
            ToolName::CreateUser => "scim_create_user",
            ToolName::UpdateUser => "scim_update_user",
            ToolName::DeleteUser => "scim_delete_user",
            ToolName::ListGroups => "scim_list_groups",
            ToolName::GetGroup => "scim_get_group",
            ToolName::CreateGroup => "scim_create_group",
            ToolName::UpdateGroup => "scim_update_group",
            ToolName::DeleteGroup => "scim_delete_group",
            ToolName::AddUsersToGroup => "scim_add_users_to_group",
            ToolName::RemoveUsersFromGroup => "scim_remove_users_from_group",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolName::ListUsers => "List or search users in SCIM",
            ToolName::GetUser => "Get a specific user by ID",
            ToolName::CreateUser => "Create a new user",
            ToolName::UpdateUser => {
                "Update an existing user. IMPORTANT: Include all fields you \
                want to preserve, especially externalId."
            }
            ToolName::DeleteUser => "Delete a user",
            ToolName::ListGroups => "List or search groups in SCIM",
            ToolName::GetGroup => "Get a specific group by ID",
            ToolName::CreateGroup => "Create a new group",
            ToolName::UpdateGroup => {
                "Update an existing group. IMPORTANT: When renaming a group, \
                you MUST include the existing externalId in the group_data to \
                preserve it."
            }
            ToolName::DeleteGroup => "Delete a group",
            ToolName::AddUsersToGroup => {
                "Add one or more users to a group using PATCH operation"
            }
            ToolName::RemoveUsersFromGroup => {
                "Remove one or more users from a group using PATCH operation"
            }
        }
    }

    /// Arguments that must be present (and not null) before any request is
    /// made.
    pub fn required_arguments(&self) -> &'static [&'static str] {
        match self {
            ToolName::ListUsers | ToolName::ListGroups => &[],
            ToolName::GetUser | ToolName::DeleteUser => &["user_id"],
            ToolName::GetGroup | ToolName::DeleteGroup => &["group_id"],
            ToolName::CreateUser => &["email", "first_name", "last_name"],
            ToolName::CreateGroup => &["display_name"],
            ToolName::UpdateUser => &["user_id", "user_data"],
            ToolName::UpdateGroup => &["group_id", "group_data"],
            ToolName::AddUsersToGroup | ToolName::RemoveUsersFromGroup => {
                &["group_id", "user_ids"]
            }
        }
    }

    fn properties(&self) -> Value {
        let list = json!({
            "filter": {
                "type": "string",
                "description": "SCIM filter expression (e.g., 'userName sw \"john\"')"
            },
            "start_index": {
                "type": "integer",
                "description": "Starting index for pagination (default: 1)"
            },
            "count": {
                "type": "integer",
                "description": "Number of results per page (max: 100)"
            }
        });
        let user_id = json!({
            "type": "string",
            "description": "The SCIM user ID"
        });
        let group_id = json!({
            "type": "string",
            "description": "The SCIM group ID"
        });

        match self {
            ToolName::ListUsers | ToolName::ListGroups => list,

            ToolName::GetUser | ToolName::DeleteUser => {
                json!({ "user_id": user_id })
            }

            ToolName::GetGroup | ToolName::DeleteGroup => {
                json!({ "group_id": group_id })
            }

            ToolName::CreateUser => json!({
                "email": {
                    "type": "string",
                    "description": "User's email address (used as userName)"
                },
                "first_name": {
                    "type": "string",
                    "description": "User's first name"
                },
                "last_name": {
                    "type": "string",
                    "description": "User's last name"
                },
                "external_id": {
                    "type": "string",
                    "description": "External ID (auto-generated if not provided)"
                },
                "password": {
                    "type": "string",
                    "description": "User password (auto-generated if not provided)"
                }
            }),

            ToolName::UpdateUser => json!({
                "user_id": user_id,
                "user_data": {
                    "type": "object",
                    "description": "SCIM user data to update. Should include \
                        'externalId' field with the existing value to preserve \
                        it. Include all fields you want to keep or update."
                }
            }),

            ToolName::CreateGroup => json!({
                "display_name": {
                    "type": "string",
                    "description": "Group display name"
                },
                "external_id": {
                    "type": "string",
                    "description": "External ID (auto-generated 8-digit number if not provided)"
                }
            }),

            ToolName::UpdateGroup => json!({
                "group_id": group_id,
                "group_data": {
                    "type": "object",
                    "description": "SCIM group data to update. MUST include \
                        'externalId' field with the existing value when \
                        updating displayName to preserve the external ID. \
                        Include all fields you want to keep or update."
                }
            }),

            ToolName::AddUsersToGroup => json!({
                "group_id": group_id,
                "user_ids": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "List of SCIM user IDs to add to the group"
                }
            }),

            ToolName::RemoveUsersFromGroup => json!({
                "group_id": group_id,
                "user_ids": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "List of SCIM user IDs to remove from the group"
                }
            }),
        }
    }

    /// JSON Schema for the tool's arguments
    pub fn input_schema(&self) -> Value {
        let mut schema = json!({
            "type": "object",
            "properties": self.properties(),
        });

        let required = self.required_arguments();
        if !required.is_empty() {
            schema["required"] = json!(required);
        }

        schema
    }

    pub fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

// Both `scim_create_user` and plain `create_user` are accepted.
impl std::str::FromStr for ToolName {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let unprefixed = name.strip_prefix(TOOL_PREFIX).unwrap_or(name);

        ToolName::ALL
            .into_iter()
            .find(|tool| &tool.as_str()[TOOL_PREFIX.len()..] == unprefixed)
            .ok_or_else(|| format!("Unknown tool: {name}"))
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tool as advertised to callers
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolDescription {
    pub name: String,

    pub description: String,

    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Descriptions of every tool, in a stable order.
pub fn tool_catalog() -> Vec<ToolDescription> {
    ToolName::ALL.iter().map(ToolName::describe).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>().unwrap(), tool);
            assert!(tool.as_str().starts_with(TOOL_PREFIX));
        }
    }

    #[test]
    fn test_unprefixed_alias() {
        assert_eq!(
            "create_user".parse::<ToolName>().unwrap(),
            ToolName::CreateUser
        );
        assert_eq!(
            "remove_users_from_group".parse::<ToolName>().unwrap(),
            ToolName::RemoveUsersFromGroup
        );
        assert!("scim_drop_tables".parse::<ToolName>().is_err());
        assert!("".parse::<ToolName>().is_err());
    }

    #[test]
    fn test_required_arguments_are_declared_properties() {
        for tool in ToolName::ALL {
            let schema = tool.input_schema();
            assert_eq!(schema["type"], "object");

            for required in tool.required_arguments() {
                assert!(
                    schema["properties"].get(*required).is_some(),
                    "{tool} requires undeclared {required}"
                );
            }
        }
    }

    #[test]
    fn test_catalog() {
        let catalog = tool_catalog();
        assert_eq!(catalog.len(), 12);

        let create_user = catalog
            .iter()
            .find(|tool| tool.name == "scim_create_user")
            .unwrap();
        assert_eq!(
            create_user.input_schema["required"],
            json!(["email", "first_name", "last_name"])
        );

        let list_users = serde_json::to_value(&catalog[0]).unwrap();
        assert_eq!(list_users["name"], "scim_list_users");
        assert!(list_users["inputSchema"].get("required").is_none());
    }
}
