// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::Utc;
use uuid::Uuid;

/// The list endpoint query string, RFC 7644 § 3.4.2
#[derive(Deserialize, JsonSchema, Clone, Debug, Default)]
pub struct ListQuery {
    #[serde(rename = "startIndex")]
    pub start_index: Option<usize>,

    pub count: Option<usize>,

    pub filter: Option<String>,
}

/// The filter expressions this server understands: a single `eq` on one of
/// a handful of attributes.
#[derive(Debug, PartialEq)]
pub enum Filter {
    UserNameEq(String),
    EmailEq(String),
    ExternalIdEq(String),
    DisplayNameEq(String),
}

impl FromStr for Filter {
    type Err = ScimError;

    fn from_str(filter: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            ScimError::invalid_filter(format!(
                "invalid or unsupported filter {filter}"
            ))
        };

        let mut parts = filter.trim().splitn(3, ' ');
        let (Some(attribute), Some(operator), Some(value)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        if !operator.eq_ignore_ascii_case("eq") {
            return Err(invalid());
        }

        let value = value
            .trim()
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .ok_or_else(invalid)?
            .to_string();

        // Attribute names are case insensitive
        match attribute.to_ascii_lowercase().as_str() {
            "username" => Ok(Filter::UserNameEq(value)),
            "emails.value" | "emails" => Ok(Filter::EmailEq(value)),
            "externalid" => Ok(Filter::ExternalIdEq(value)),
            "displayname" => Ok(Filter::DisplayNameEq(value)),
            _ => Err(invalid()),
        }
    }
}

impl Filter {
    fn matches_user(&self, user: &User) -> Result<bool, ScimError> {
        let matches = match self {
            Filter::UserNameEq(user_name) => user
                .user_name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(user_name)),

            Filter::EmailEq(email) => user
                .emails
                .iter()
                .flatten()
                .filter_map(|e| e.value.as_deref())
                .any(|value| value.eq_ignore_ascii_case(email)),

            // externalId is caseExact
            Filter::ExternalIdEq(external_id) => {
                user.external_id.as_deref() == Some(external_id.as_str())
            }

            Filter::DisplayNameEq(_) => {
                return Err(ScimError::invalid_filter(String::from(
                    "displayName is not a User attribute",
                )));
            }
        };

        Ok(matches)
    }

    fn matches_group(&self, group: &Group) -> Result<bool, ScimError> {
        let matches = match self {
            Filter::DisplayNameEq(display_name) => group
                .display_name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(display_name)),

            Filter::ExternalIdEq(external_id) => {
                group.external_id.as_deref() == Some(external_id.as_str())
            }

            Filter::UserNameEq(_) | Filter::EmailEq(_) => {
                return Err(ScimError::invalid_filter(String::from(
                    "filter attribute is not a Group attribute",
                )));
            }
        };

        Ok(matches)
    }
}

#[derive(Default)]
struct StoreState {
    users: BTreeMap<String, User>,
    groups: BTreeMap<String, Group>,
}

/// A non-optimized in-memory provider for use with tests. Stored resources
/// carry their `id` and `meta`; stored users also keep the password they were
/// created with, which is stripped whenever a user is rendered.
#[derive(Default)]
pub struct Store {
    state: Mutex<StoreState>,
}

fn new_meta(resource_type: ResourceType, id: &str) -> Meta {
    let now = Utc::now().to_rfc3339();

    Meta {
        resource_type: Some(resource_type.to_string()),
        created: Some(now.clone()),
        last_modified: Some(now),
        version: Some(String::from("W/unimplemented")),
        location: Some(format!("/v2/{}", resource_type.resource_endpoint(id))),
        extra: Extra::new(),
    }
}

/// Keep creation time, bump the modification time.
fn touched_meta(
    existing: Option<&Meta>,
    resource_type: ResourceType,
    id: &str,
) -> Meta {
    let mut meta = new_meta(resource_type, id);
    if let Some(created) = existing.and_then(|meta| meta.created.clone()) {
        meta.created = Some(created);
    }
    meta
}

fn render_user(user: &User) -> User {
    User { password: None, ..user.clone() }
}

fn page<R>(resources: Vec<R>, query: &ListQuery) -> ListResponse<R> {
    let total_results = resources.len();
    let start_index = query.start_index.unwrap_or(1).max(1);

    let resources: Vec<R> = resources
        .into_iter()
        .skip(start_index - 1)
        .take(query.count.unwrap_or(usize::MAX))
        .collect();

    ListResponse::page(resources, start_index, total_results)
}

fn parse_filter(query: &ListQuery) -> Result<Option<Filter>, ScimError> {
    query
        .filter
        .as_deref()
        .filter(|filter| !filter.trim().is_empty())
        .map(Filter::from_str)
        .transpose()
}

impl StoreState {
    fn user_name_taken(
        &self,
        user_name: &str,
        except_id: Option<&str>,
    ) -> bool {
        self.users.values().any(|user| {
            user.user_name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(user_name))
                && user.id.as_deref() != except_id
        })
    }

    fn display_name_taken(
        &self,
        display_name: &str,
        except_id: Option<&str>,
    ) -> bool {
        self.groups.values().any(|group| {
            group.display_name.as_deref() == Some(display_name)
                && group.id.as_deref() != except_id
        })
    }

    /// Check each member refers to a user, filling in `display` from the
    /// user's userName if the caller left it out.
    fn resolve_members(
        &self,
        members: Vec<GroupMember>,
    ) -> Result<Vec<GroupMember>, ScimError> {
        members
            .into_iter()
            .map(|mut member| {
                let Some(user_id) = member.value.as_deref() else {
                    return Err(ScimError::invalid_syntax(String::from(
                        "group member missing value field",
                    )));
                };

                let user = self
                    .users
                    .get(user_id)
                    .ok_or_else(|| ScimError::not_found(user_id))?;

                if member.display.is_none() {
                    member.display = user.user_name.clone();
                }

                Ok(member)
            })
            .collect()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// A user as stored, password included.
    pub fn stored_user(&self, user_id: &str) -> Option<User> {
        lock(&self.state).users.get(user_id).cloned()
    }

    pub fn list_users(
        &self,
        query: &ListQuery,
    ) -> Result<ListResponse<User>, ScimError> {
        let filter = parse_filter(query)?;
        let state = lock(&self.state);

        let mut users = Vec::new();
        for user in state.users.values() {
            if let Some(filter) = &filter {
                if !filter.matches_user(user)? {
                    continue;
                }
            }
            users.push(render_user(user));
        }

        Ok(page(users, query))
    }

    pub fn get_user(&self, user_id: &str) -> Result<User, ScimError> {
        let state = lock(&self.state);

        state
            .users
            .get(user_id)
            .map(render_user)
            .ok_or_else(|| ScimError::not_found(user_id))
    }

    pub fn create_user(&self, mut user: User) -> Result<User, ScimError> {
        let mut state = lock(&self.state);

        let user_name = match user.user_name.as_deref() {
            Some(user_name) if !user_name.is_empty() => user_name.to_string(),
            _ => {
                return Err(ScimError::invalid_syntax(String::from(
                    "userName is required",
                )));
            }
        };

        if state.user_name_taken(&user_name, None) {
            return Err(ScimError::conflict(format!("userName {user_name}")));
        }

        let id = Uuid::new_v4().to_string();
        user.id = Some(id.clone());
        user.meta = Some(new_meta(ResourceType::User, &id));
        if user.schemas.is_empty() {
            user.schemas = vec![USER_URN.to_string()];
        }

        let rendered = render_user(&user);
        state.users.insert(id, user);

        Ok(rendered)
    }

    /// PUT semantics: the body replaces the stored user outright. Only `id`
    /// and the creation time survive, plus the password if the body has none.
    pub fn replace_user(
        &self,
        user_id: &str,
        mut user: User,
    ) -> Result<User, ScimError> {
        let mut state = lock(&self.state);

        if let Some(user_name) = user.user_name.as_deref() {
            if state.user_name_taken(user_name, Some(user_id)) {
                return Err(ScimError::conflict(format!(
                    "userName {user_name}"
                )));
            }
        }

        let existing = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| ScimError::not_found(user_id))?;

        user.id = Some(user_id.to_string());
        user.meta = Some(touched_meta(
            existing.meta.as_ref(),
            ResourceType::User,
            user_id,
        ));
        if user.password.is_none() {
            user.password = existing.password.take();
        }

        *existing = user;

        Ok(render_user(existing))
    }

    pub fn delete_user(&self, user_id: &str) -> Result<(), ScimError> {
        let mut state = lock(&self.state);

        if state.users.remove(user_id).is_none() {
            return Err(ScimError::not_found(user_id));
        }

        // Drop the user from every group it belonged to
        for group in state.groups.values_mut() {
            if let Some(members) = &mut group.members {
                members
                    .retain(|member| member.value.as_deref() != Some(user_id));
            }
        }

        Ok(())
    }

    pub fn list_groups(
        &self,
        query: &ListQuery,
    ) -> Result<ListResponse<Group>, ScimError> {
        let filter = parse_filter(query)?;
        let state = lock(&self.state);

        let mut groups = Vec::new();
        for group in state.groups.values() {
            if let Some(filter) = &filter {
                if !filter.matches_group(group)? {
                    continue;
                }
            }
            groups.push(group.clone());
        }

        Ok(page(groups, query))
    }

    pub fn get_group(&self, group_id: &str) -> Result<Group, ScimError> {
        lock(&self.state)
            .groups
            .get(group_id)
            .cloned()
            .ok_or_else(|| ScimError::not_found(group_id))
    }

    pub fn create_group(&self, mut group: Group) -> Result<Group, ScimError> {
        let mut state = lock(&self.state);

        let display_name = match group.display_name.as_deref() {
            Some(display_name) if !display_name.is_empty() => {
                display_name.to_string()
            }
            _ => {
                return Err(ScimError::invalid_syntax(String::from(
                    "displayName is required",
                )));
            }
        };

        if state.display_name_taken(&display_name, None) {
            return Err(ScimError::conflict(format!(
                "displayName {display_name}"
            )));
        }

        if let Some(members) = group.members.take() {
            group.members = Some(state.resolve_members(members)?);
        }

        let id = Uuid::new_v4().to_string();
        group.id = Some(id.clone());
        group.meta = Some(new_meta(ResourceType::Group, &id));
        if group.schemas.is_empty() {
            group.schemas = vec![GROUP_URN.to_string()];
        }

        state.groups.insert(id, group.clone());

        Ok(group)
    }

    pub fn replace_group(
        &self,
        group_id: &str,
        mut group: Group,
    ) -> Result<Group, ScimError> {
        let mut state = lock(&self.state);

        if let Some(display_name) = group.display_name.as_deref() {
            if state.display_name_taken(display_name, Some(group_id)) {
                return Err(ScimError::conflict(format!(
                    "displayName {display_name}"
                )));
            }
        }

        if let Some(members) = group.members.take() {
            group.members = Some(state.resolve_members(members)?);
        }

        let existing = state
            .groups
            .get_mut(group_id)
            .ok_or_else(|| ScimError::not_found(group_id))?;

        group.id = Some(group_id.to_string());
        group.meta = Some(touched_meta(
            existing.meta.as_ref(),
            ResourceType::Group,
            group_id,
        ));

        *existing = group;

        Ok(existing.clone())
    }

    pub fn delete_group(&self, group_id: &str) -> Result<(), ScimError> {
        lock(&self.state)
            .groups
            .remove(group_id)
            .map(|_| ())
            .ok_or_else(|| ScimError::not_found(group_id))
    }

    /// Apply a PatchOp request to a group. Operations are applied in order to
    /// a copy, so a request either applies completely or not at all.
    pub fn patch_group(
        &self,
        group_id: &str,
        request: PatchRequest,
    ) -> Result<Group, ScimError> {
        request.validate_schema()?;

        let mut state = lock(&self.state);

        let mut group = state
            .groups
            .get(group_id)
            .cloned()
            .ok_or_else(|| ScimError::not_found(group_id))?;

        for operation in request.operations {
            apply_patch_op(&state, &mut group, operation)?;
        }

        group.meta = Some(touched_meta(
            group.meta.as_ref(),
            ResourceType::Group,
            group_id,
        ));
        state.groups.insert(group_id.to_string(), group.clone());

        Ok(group)
    }
}

fn parse_members(
    value: serde_json::Value,
) -> Result<Vec<GroupMember>, ScimError> {
    // A single member object is accepted as well as a list
    let value = match value {
        serde_json::Value::Object(_) => serde_json::Value::Array(vec![value]),
        value => value,
    };

    serde_json::from_value(value).map_err(|e| {
        ScimError::invalid_syntax(format!("invalid members value: {e}"))
    })
}

fn apply_patch_op(
    state: &StoreState,
    group: &mut Group,
    operation: PatchOp,
) -> Result<(), ScimError> {
    match operation {
        PatchOp::Add { path: Some(path), value } => {
            if path.parse::<MemberPath>()? != MemberPath::All {
                return Err(PatchRequestError::Unsupported(format!(
                    "add to {path}"
                ))
                .into());
            }

            let new_members = state.resolve_members(parse_members(value)?)?;
            let members = group.members.get_or_insert_default();

            for member in new_members {
                if !members.iter().any(|m| m.value == member.value) {
                    members.push(member);
                }
            }
        }

        PatchOp::Remove { path, .. } => match path.parse::<MemberPath>()? {
            MemberPath::All => group.members = None,

            MemberPath::Individual(user_id) => {
                if let Some(members) = &mut group.members {
                    members.retain(|member| {
                        member.value.as_deref() != Some(user_id.as_str())
                    });
                }
            }
        },

        PatchOp::Replace { path: Some(path), value } => {
            if path.eq_ignore_ascii_case("displayName") {
                let display_name = value.as_str().ok_or_else(|| {
                    ScimError::invalid_syntax(String::from(
                        "displayName must be a string",
                    ))
                })?;
                group.display_name = Some(display_name.to_string());
            } else if path.parse::<MemberPath>()? == MemberPath::All {
                let members = state.resolve_members(parse_members(value)?)?;
                group.members = Some(members);
            } else {
                return Err(PatchRequestError::Unsupported(format!(
                    "replace of {path}"
                ))
                .into());
            }
        }

        PatchOp::Add { path: None, .. }
        | PatchOp::Replace { path: None, .. } => {
            return Err(PatchRequestError::Unsupported(String::from(
                "operations without a path",
            ))
            .into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn user(user_name: &str) -> User {
        CreateUserRequest::new(user_name, "Test", "User").into_user()
    }

    fn query(filter: Option<&str>) -> ListQuery {
        ListQuery { filter: filter.map(String::from), ..Default::default() }
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            "userName eq \"dwight@example.com\"".parse::<Filter>().unwrap(),
            Filter::UserNameEq("dwight@example.com".to_string())
        );
        assert_eq!(
            "emails.value EQ \"a b\"".parse::<Filter>().unwrap(),
            Filter::EmailEq("a b".to_string())
        );
        assert_eq!(
            "displayName eq \"Sales Reps\"".parse::<Filter>().unwrap(),
            Filter::DisplayNameEq("Sales Reps".to_string())
        );

        for filter in [
            "userName sw \"d\"",
            "userName eq dwight",
            "title eq \"Manager\"",
            "userName",
        ] {
            let err = filter.parse::<Filter>().unwrap_err();
            assert_eq!(err.error_type, Some(ErrorType::InvalidFilter));
        }
    }

    #[test]
    fn test_password_is_stored_but_not_rendered() {
        let store = Store::new();
        let created = store.create_user(user("jim@example.com")).unwrap();
        let id = created.id.clone().unwrap();

        assert!(created.password.is_none());
        assert!(store.get_user(&id).unwrap().password.is_none());
        assert!(store.stored_user(&id).unwrap().password.is_some());
        assert_eq!(
            created.meta.unwrap().location.unwrap(),
            format!("/v2/Users/{id}")
        );
    }

    #[test]
    fn test_user_name_is_unique() {
        let store = Store::new();
        store.create_user(user("jim@example.com")).unwrap();

        let err = store.create_user(user("JIM@example.com")).unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.error_type, Some(ErrorType::Uniqueness));
    }

    #[test]
    fn test_filter_and_pagination() {
        let store = Store::new();
        for i in 0..5 {
            store.create_user(user(&format!("user{i}@example.com"))).unwrap();
        }

        let list = store
            .list_users(&query(Some("emails.value eq \"user3@example.com\"")))
            .unwrap();
        assert_eq!(list.total_results, 1);
        assert_eq!(
            list.resources[0].user_name.as_deref(),
            Some("user3@example.com")
        );

        let list = store
            .list_users(&ListQuery {
                start_index: Some(2),
                count: Some(2),
                filter: None,
            })
            .unwrap();
        assert_eq!(list.total_results, 5);
        assert_eq!(list.start_index, Some(2));
        assert_eq!(list.items_per_page, Some(2));

        let err =
            store.list_groups(&query(Some("userName eq \"x\""))).unwrap_err();
        assert_eq!(err.error_type, Some(ErrorType::InvalidFilter));
    }

    #[test]
    fn test_patch_members() {
        let store = Store::new();
        let jim = store.create_user(user("jim@example.com")).unwrap();
        let pam = store.create_user(user("pam@example.com")).unwrap();
        let jim_id = jim.id.unwrap();
        let pam_id = pam.id.unwrap();

        let group = store
            .create_group(CreateGroupRequest::new("Sales").into_group())
            .unwrap();
        let group_id = group.id.unwrap();

        let group = store
            .patch_group(
                &group_id,
                PatchRequest::add_members(&[&jim_id, &pam_id]),
            )
            .unwrap();
        assert_eq!(group.member_count(), 2);
        assert_eq!(
            group.members.as_ref().unwrap()[0].display.as_deref(),
            Some("jim@example.com")
        );

        let group = store
            .patch_group(&group_id, PatchRequest::remove_members(&[&jim_id]))
            .unwrap();
        assert!(!group.has_member(&jim_id));
        assert!(group.has_member(&pam_id));

        // Unknown members fail the whole request
        let err = store
            .patch_group(&group_id, PatchRequest::add_members(&["nope"]))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(store.get_group(&group_id).unwrap().member_count(), 1);

        store.delete_user(&pam_id).unwrap();
        assert_eq!(store.get_group(&group_id).unwrap().member_count(), 0);
    }

    #[test]
    fn test_replace_keeps_created() {
        let store = Store::new();
        let created = store
            .create_group(CreateGroupRequest::new("Sales").into_group())
            .unwrap();
        let group_id = created.id.clone().unwrap();

        let replaced = store
            .replace_group(
                &group_id,
                Group {
                    display_name: Some("Sales Reps".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(replaced.display_name.as_deref(), Some("Sales Reps"));
        assert_eq!(replaced.external_id, None);
        assert_eq!(
            replaced.meta.unwrap().created,
            created.meta.unwrap().created
        );

        let err =
            store.replace_group("missing", Group::default()).unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
