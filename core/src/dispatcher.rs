// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

use serde::de::DeserializeOwned;
use serde_json::Value;
use slog::Logger;
use slog::debug;
use slog::warn;

/// Why a tool call never produced a provider response.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("missing required argument(s): {}", .0.join(", "))]
    MissingArguments(Vec<&'static str>),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// What every tool call returns.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ToolOutcome {
    /// The provider answered, whatever the status
    Response { status_code: u16, success: bool, data: Value },

    /// The call was rejected before or while talking to the provider
    Error { error: String, tool: String, arguments: Value },
}

impl ToolOutcome {
    pub fn from_response(response: &ScimResponse) -> Self {
        ToolOutcome::Response {
            status_code: response.status_code(),
            success: response.is_success(),
            data: response.data(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Error { .. })
    }

    pub fn to_json(&self) -> Value {
        // Both variants are plain JSON already.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Deserialize)]
struct ListArgs {
    filter: Option<String>,
    start_index: Option<u32>,
    count: Option<u32>,
}

impl From<ListArgs> for QueryParams {
    fn from(args: ListArgs) -> QueryParams {
        let defaults = QueryParams::default();

        QueryParams {
            start_index: args.start_index.unwrap_or(defaults.start_index),
            count: args.count.unwrap_or(defaults.count),
            filter: args.filter,
        }
    }
}

#[derive(Deserialize)]
struct UserIdArgs {
    user_id: String,
}

#[derive(Deserialize)]
struct GroupIdArgs {
    group_id: String,
}

/// A replacement body, kept as the caller wrote it. Only its being a JSON
/// object is checked.
type ResourceBody = serde_json::Map<String, Value>;

#[derive(Deserialize)]
struct UpdateUserArgs {
    user_id: String,
    user_data: ResourceBody,
}

#[derive(Deserialize)]
struct UpdateGroupArgs {
    group_id: String,
    group_data: ResourceBody,
}

#[derive(Deserialize)]
struct MembershipArgs {
    group_id: String,
    user_ids: Vec<String>,
}

/// Maps tool calls onto [`ScimClient`] methods.
///
/// [`Dispatcher::call`] never fails and never panics on bad input: unknown
/// tools, missing or malformed arguments and transport failures all come back
/// as [`ToolOutcome::Error`], so one bad call cannot take down whoever is
/// serving tools.
pub struct Dispatcher {
    log: Logger,
    client: ScimClient,
}

impl Dispatcher {
    pub fn new(log: Logger, client: ScimClient) -> Self {
        Self { log, client }
    }

    pub fn client(&self) -> &ScimClient {
        &self.client
    }

    pub fn tools(&self) -> Vec<ToolDescription> {
        tool_catalog()
    }

    pub fn call(&self, name: &str, arguments: Value) -> ToolOutcome {
        debug!(self.log, "tool call"; "tool" => name);

        match self.try_call(name, &arguments) {
            Ok(response) => ToolOutcome::from_response(&response),

            Err(error) => {
                warn!(
                    self.log,
                    "tool call failed";
                    "tool" => name,
                    "error" => %error,
                );

                ToolOutcome::Error {
                    error: error.to_string(),
                    tool: name.to_string(),
                    arguments,
                }
            }
        }
    }

    fn try_call(
        &self,
        name: &str,
        arguments: &Value,
    ) -> Result<ScimResponse, ToolError> {
        let tool: ToolName = name
            .parse()
            .map_err(|_| ToolError::UnknownTool(name.to_string()))?;
        let arguments = checked_arguments(tool, arguments)?;

        let response = match tool {
            ToolName::ListUsers => {
                let args: ListArgs = parse_arguments(arguments)?;
                self.client.get_users(&args.into())?
            }

            ToolName::GetUser => {
                let args: UserIdArgs = parse_arguments(arguments)?;
                self.client.get_user(&args.user_id)?
            }

            ToolName::CreateUser => {
                let request: CreateUserRequest = parse_arguments(arguments)?;
                self.client.create_user(request)?
            }

            ToolName::UpdateUser => {
                let args: UpdateUserArgs = parse_arguments(arguments)?;
                self.client.update_user(&args.user_id, &args.user_data)?
            }

            ToolName::DeleteUser => {
                let args: UserIdArgs = parse_arguments(arguments)?;
                self.client.delete_user(&args.user_id)?
            }

            ToolName::ListGroups => {
                let args: ListArgs = parse_arguments(arguments)?;
                self.client.get_groups(&args.into())?
            }

            ToolName::GetGroup => {
                let args: GroupIdArgs = parse_arguments(arguments)?;
                self.client.get_group(&args.group_id)?
            }

            ToolName::CreateGroup => {
                let request: CreateGroupRequest = parse_arguments(arguments)?;
                self.client.create_group(request)?
            }

            ToolName::UpdateGroup => {
                let args: UpdateGroupArgs = parse_arguments(arguments)?;
                self.client.update_group(&args.group_id, &args.group_data)?
            }

            ToolName::DeleteGroup => {
                let args: GroupIdArgs = parse_arguments(arguments)?;
                self.client.delete_group(&args.group_id)?
            }

            ToolName::AddUsersToGroup => {
                let args: MembershipArgs = parse_arguments(arguments)?;
                self.client
                    .add_members_to_group(&args.group_id, &args.user_ids)?
            }

            ToolName::RemoveUsersFromGroup => {
                let args: MembershipArgs = parse_arguments(arguments)?;
                self.client
                    .remove_members_from_group(&args.group_id, &args.user_ids)?
            }
        };

        Ok(response)
    }
}

/// The arguments as an object, with every required argument present. A
/// missing argument list is the same as an empty one.
fn checked_arguments(
    tool: ToolName,
    arguments: &Value,
) -> Result<serde_json::Map<String, Value>, ToolError> {
    let arguments = match arguments {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        other => {
            return Err(ToolError::InvalidArguments(format!(
                "expected an object, got {other}"
            )));
        }
    };

    let missing: Vec<&'static str> = tool
        .required_arguments()
        .iter()
        .copied()
        .filter(|name| arguments.get(*name).is_none_or(Value::is_null))
        .collect();

    if !missing.is_empty() {
        return Err(ToolError::MissingArguments(missing));
    }

    Ok(arguments)
}

fn parse_arguments<T: DeserializeOwned>(
    arguments: serde_json::Map<String, Value>,
) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(arguments))
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))
}
