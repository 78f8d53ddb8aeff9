// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::BufRead;
use std::io::Write;

use anyhow::Context;
use anyhow::bail;
use clap::Parser;
use clap::Subcommand;
use scimcp::CreateGroupRequest;
use scimcp::CreateUserRequest;
use scimcp::Group;
use scimcp::GroupMember;
use scimcp::ListResponse;
use scimcp::MAX_PAGE_SIZE;
use scimcp::QueryParams;
use scimcp::ScimClient;
use scimcp::ScimResponse;
use scimcp::User;
use serde::Serialize;
use slog::Logger;
use slog::info;
use slog::warn;

#[derive(Debug, Parser)]
#[clap(about = "Manage users and groups on a SCIM 2 provider")]
pub struct Args {
    /// Defaults to $SCIM_BASE_URL
    #[clap(long)]
    pub base_url: Option<String>,

    /// A Bearer token, defaults to $SCIM_TOKEN
    #[clap(long)]
    pub token: Option<String>,

    /// Log every request and response
    #[clap(long)]
    pub debug: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(subcommand)]
    Users(UsersCommand),

    #[clap(subcommand)]
    Groups(GroupsCommand),
}

#[derive(Debug, Clone, clap::Args)]
pub struct ListArgs {
    /// Page size; anything over 100 is sent as 100
    #[clap(long, default_value_t = MAX_PAGE_SIZE)]
    pub count: u32,

    #[clap(
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub start_index: u32,

    /// A SCIM filter expression, e.g. 'userName eq "pam@example.com"'
    #[clap(long)]
    pub filter: Option<String>,

    /// One line per resource instead of the full JSON
    #[clap(long)]
    pub summary: bool,
}

impl Default for ListArgs {
    fn default() -> Self {
        Self {
            count: MAX_PAGE_SIZE,
            start_index: 1,
            filter: None,
            summary: false,
        }
    }
}

impl From<&ListArgs> for QueryParams {
    fn from(args: &ListArgs) -> Self {
        let params = QueryParams::default()
            .with_start_index(args.start_index)
            .with_count(args.count);

        match &args.filter {
            Some(filter) => params.with_filter(filter),
            None => params,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    List(ListArgs),

    Get {
        id: String,
    },

    Create {
        #[clap(long)]
        email: String,

        #[clap(long)]
        first_name: String,

        #[clap(long)]
        last_name: String,

        /// Generated if not given
        #[clap(long)]
        external_id: Option<String>,

        /// Generated if not given
        #[clap(long)]
        password: Option<String>,

        /// Print the request body instead of sending it
        #[clap(long)]
        dry_run: bool,
    },

    Delete {
        id: String,

        #[clap(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[clap(long)]
        force: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum GroupsCommand {
    List(ListArgs),

    Get {
        id: String,
    },

    Create {
        #[clap(long)]
        display_name: String,

        /// Generated if not given
        #[clap(long)]
        external_id: Option<String>,

        #[clap(long)]
        dry_run: bool,
    },

    Delete {
        id: String,

        #[clap(long)]
        dry_run: bool,

        #[clap(long)]
        force: bool,
    },

    /// Add a user to a group, both looked up by name
    AddMember {
        /// The group's displayName
        #[clap(long)]
        group: String,

        /// The user's email
        #[clap(long)]
        email: String,

        #[clap(long)]
        dry_run: bool,

        #[clap(long)]
        force: bool,
    },

    /// Remove users from a group by id
    RemoveMember {
        #[clap(long)]
        group_id: String,

        #[clap(long = "user-id", required = true, num_args = 1..)]
        user_ids: Vec<String>,
    },
}

/// Runs CLI commands against one provider. Prompts are read from `input`
/// and everything meant for the operator goes to `output`.
pub struct Operator<R, W> {
    log: Logger,
    client: ScimClient,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Operator<R, W> {
    pub fn new(log: Logger, client: ScimClient, input: R, output: W) -> Self {
        Self { log, client, input, output }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn run(&mut self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Users(command) => self.users(command),
            Command::Groups(command) => self.groups(command),
        }
    }

    fn users(&mut self, command: UsersCommand) -> anyhow::Result<()> {
        match command {
            UsersCommand::List(args) => {
                self.warn_on_count(&args);
                let response = self.client.get_users(&(&args).into())?;
                let list: ListResponse<User> =
                    self.expect_json(&response, "listing users")?;

                if args.summary {
                    for user in &list.resources {
                        writeln!(self.output, "{}", user_summary(user))?;
                    }
                    self.page_hint(&list, args.start_index)?;
                } else {
                    self.print_json(&response.data())?;
                }
            }

            UsersCommand::Get { id } => {
                let response = self.client.get_user(&id)?;
                self.expect_success(&response, "getting user")?;
                self.print_json(&response.data())?;
            }

            UsersCommand::Create {
                email,
                first_name,
                last_name,
                external_id,
                password,
                dry_run,
            } => {
                let mut request =
                    CreateUserRequest::new(email, first_name, last_name);
                if let Some(external_id) = external_id {
                    request = request.with_external_id(external_id);
                }
                if let Some(password) = password {
                    request = request.with_password(password);
                }

                if dry_run {
                    writeln!(self.output, "dry run, would POST:")?;
                    self.print_json(&request.into_user())?;
                    return Ok(());
                }

                let response = self.client.create_user(request)?;
                let user: User = self.expect_json(&response, "creating user")?;
                info!(self.log, "created user"; "id" => user.id.as_deref());
                self.print_json(&response.data())?;
            }

            UsersCommand::Delete { id, dry_run, force } => {
                let response = self.client.get_user(&id)?;
                let user: User = self.expect_json(&response, "getting user")?;
                writeln!(self.output, "{}", user_summary(&user))?;

                if dry_run {
                    writeln!(self.output, "dry run, would delete user {id}")?;
                    return Ok(());
                }

                if !force && !self.confirm_delete()? {
                    writeln!(self.output, "aborted")?;
                    return Ok(());
                }

                let response = self.client.delete_user(&id)?;
                self.expect_success(&response, "deleting user")?;
                info!(self.log, "deleted user"; "id" => &id);
                writeln!(self.output, "deleted user {id}")?;
            }
        }

        Ok(())
    }

    fn groups(&mut self, command: GroupsCommand) -> anyhow::Result<()> {
        match command {
            GroupsCommand::List(args) => {
                self.warn_on_count(&args);
                let response = self.client.get_groups(&(&args).into())?;
                let list: ListResponse<Group> =
                    self.expect_json(&response, "listing groups")?;

                if args.summary {
                    for group in &list.resources {
                        writeln!(self.output, "{}", group_summary(group))?;
                    }
                    self.page_hint(&list, args.start_index)?;
                } else {
                    self.print_json(&response.data())?;
                }
            }

            GroupsCommand::Get { id } => {
                let response = self.client.get_group(&id)?;
                self.expect_success(&response, "getting group")?;
                self.print_json(&response.data())?;
            }

            GroupsCommand::Create { display_name, external_id, dry_run } => {
                let mut request = CreateGroupRequest::new(display_name);
                if let Some(external_id) = external_id {
                    request = request.with_external_id(external_id);
                }

                if dry_run {
                    writeln!(self.output, "dry run, would POST:")?;
                    self.print_json(&request.into_group())?;
                    return Ok(());
                }

                let response = self.client.create_group(request)?;
                let group: Group =
                    self.expect_json(&response, "creating group")?;
                info!(self.log, "created group"; "id" => group.id.as_deref());
                self.print_json(&response.data())?;
            }

            GroupsCommand::Delete { id, dry_run, force } => {
                let response = self.client.get_group(&id)?;
                let group: Group =
                    self.expect_json(&response, "getting group")?;
                writeln!(self.output, "{}", group_summary(&group))?;

                if dry_run {
                    writeln!(self.output, "dry run, would delete group {id}")?;
                    return Ok(());
                }

                if !force && !self.confirm_delete()? {
                    writeln!(self.output, "aborted")?;
                    return Ok(());
                }

                let response = self.client.delete_group(&id)?;
                self.expect_success(&response, "deleting group")?;
                info!(self.log, "deleted group"; "id" => &id);
                writeln!(self.output, "deleted group {id}")?;
            }

            GroupsCommand::AddMember { group, email, dry_run, force } => {
                self.add_member(&group, &email, dry_run, force)?;
            }

            GroupsCommand::RemoveMember { group_id, user_ids } => {
                let response = self
                    .client
                    .remove_members_from_group(&group_id, &user_ids)?;
                self.expect_success(&response, "removing members")?;
                self.print_json(&response.data())?;
            }
        }

        Ok(())
    }

    fn add_member(
        &mut self,
        group_name: &str,
        email: &str,
        dry_run: bool,
        force: bool,
    ) -> anyhow::Result<()> {
        let users = self.client.get_users(
            &QueryParams::default()
                .with_filter(format!("emails.value eq \"{email}\"")),
        )?;
        let users: ListResponse<User> =
            self.expect_json(&users, "looking up user")?;
        let Some(user) = users.resources.into_iter().next() else {
            bail!("no user with email {email}");
        };

        let groups = self.client.get_groups(
            &QueryParams::default()
                .with_filter(format!("displayName eq \"{group_name}\"")),
        )?;
        let groups: ListResponse<Group> =
            self.expect_json(&groups, "looking up group")?;
        let Some(group) = groups.resources.into_iter().next() else {
            bail!("no group named {group_name}");
        };

        let group_id = group.id.clone().context("group has no id")?;
        let user_id = user.id.as_deref().context("user has no id")?;

        if group.has_member(user_id) {
            writeln!(
                self.output,
                "{email} is already a member of {group_name}"
            )?;
            return Ok(());
        }

        let merged = merged_group(&group, &user)?;

        if dry_run {
            writeln!(self.output, "dry run, would PUT to group {group_id}:")?;
            self.print_json(&merged)?;
            return Ok(());
        }

        if !force {
            let answer =
                self.prompt(&format!("add {email} to {group_name}? [y/N] "))?;
            if !matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes") {
                writeln!(self.output, "aborted")?;
                return Ok(());
            }
        }

        let response = self.client.update_group(&group_id, &merged)?;
        let updated: Group = self.expect_json(&response, "updating group")?;
        info!(self.log, "added member";
            "group" => &group_id, "user" => user_id);
        writeln!(
            self.output,
            "added {email} to {group_name} ({} members)",
            updated.member_count()
        )?;

        Ok(())
    }

    fn warn_on_count(&self, args: &ListArgs) {
        if args.count > MAX_PAGE_SIZE {
            warn!(self.log, "Count limited to maximum of {}", MAX_PAGE_SIZE;
                "requested" => args.count);
        }
    }

    fn page_hint<T>(
        &mut self,
        list: &ListResponse<T>,
        start_index: u32,
    ) -> anyhow::Result<()> {
        let next = start_index as usize + list.resources.len();
        if !list.resources.is_empty() && next <= list.total_results {
            writeln!(
                self.output,
                "{} of {} shown, next page: --start-index {next}",
                list.resources.len(),
                list.total_results
            )?;
        }

        Ok(())
    }

    /// Print the provider's body and fail unless the status is a success.
    fn expect_success(
        &mut self,
        response: &ScimResponse,
        action: &str,
    ) -> anyhow::Result<()> {
        if !response.is_success() {
            self.print_json(&response.data())?;
            bail!("{action} failed with status {}", response.status_code());
        }

        Ok(())
    }

    fn expect_json<T: serde::de::DeserializeOwned>(
        &mut self,
        response: &ScimResponse,
        action: &str,
    ) -> anyhow::Result<T> {
        self.expect_success(response, action)?;
        response
            .json()
            .with_context(|| format!("{action}: unexpected response body"))
    }

    fn print_json<T: Serialize>(&mut self, value: &T) -> anyhow::Result<()> {
        writeln!(self.output, "{}", serde_json::to_string_pretty(value)?)?;
        Ok(())
    }

    fn prompt(&mut self, prompt: &str) -> anyhow::Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    fn confirm_delete(&mut self) -> anyhow::Result<bool> {
        Ok(self.prompt("type 'DELETE' to confirm: ")? == "DELETE")
    }
}

/// The full replacement body for `group` with `user` appended to its
/// members. `id` and `meta` belong to the provider and are left out.
pub fn merged_group(group: &Group, user: &User) -> anyhow::Result<Group> {
    let user_id = user.id.as_deref().context("user has no id")?;

    let mut member = GroupMember::new(user_id);
    if let Some(user_name) = &user.user_name {
        member = member.with_display(user_name);
    }

    let mut merged = group.clone();
    merged.id = None;
    merged.meta = None;
    merged.members.get_or_insert_default().push(member);

    Ok(merged)
}

fn user_summary(user: &User) -> String {
    format!(
        "{}  {}  {}  active={}",
        user.id.as_deref().unwrap_or("-"),
        user.user_name.as_deref().unwrap_or("-"),
        user.full_name().unwrap_or_default(),
        user.active.map_or("-", |active| if active { "yes" } else { "no" }),
    )
}

fn group_summary(group: &Group) -> String {
    format!(
        "{}  {}  externalId={}  members={}",
        group.id.as_deref().unwrap_or("-"),
        group.display_name.as_deref().unwrap_or("-"),
        group.external_id.as_deref().unwrap_or("-"),
        group.member_count(),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merged_group() {
        let group: Group = serde_json::from_value(json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:Group"],
            "id": "g1",
            "displayName": "Sales",
            "externalId": "12345678",
            "members": [{"value": "u1", "display": "jim@example.com"}],
            "meta": {"resourceType": "Group"},
            "x-region": "north"
        }))
        .unwrap();

        let user: User = serde_json::from_value(json!({
            "id": "u2",
            "userName": "pam@example.com"
        }))
        .unwrap();

        let merged = merged_group(&group, &user).unwrap();

        assert_eq!(
            serde_json::to_value(&merged).unwrap(),
            json!({
                "schemas": ["urn:ietf:params:scim:schemas:core:2.0:Group"],
                "displayName": "Sales",
                "externalId": "12345678",
                "members": [
                    {"value": "u1", "display": "jim@example.com"},
                    {"value": "u2", "display": "pam@example.com"}
                ],
                "x-region": "north"
            })
        );

        // A group without members gets a list with just the new one
        let empty =
            Group { id: Some(String::from("g2")), ..Default::default() };
        let merged = merged_group(&empty, &user).unwrap();
        assert_eq!(merged.member_count(), 1);

        assert!(merged_group(&group, &User::default()).is_err());
    }

    #[test]
    fn test_list_args_to_query() {
        let args = ListArgs {
            count: 500,
            start_index: 3,
            filter: Some(String::from("userName sw \"p\"")),
            summary: true,
        };

        let params: QueryParams = (&args).into();
        assert_eq!(
            params.to_pairs(),
            vec![
                ("startIndex", String::from("3")),
                ("count", String::from("100")),
                ("filter", String::from("userName sw \"p\"")),
            ]
        );
    }

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "scimcp",
            "--token",
            "t",
            "groups",
            "remove-member",
            "--group-id",
            "g",
            "--user-id",
            "u1",
            "u2",
        ])
        .unwrap();

        assert_eq!(args.token.as_deref(), Some("t"));
        match args.command {
            Command::Groups(GroupsCommand::RemoveMember {
                group_id,
                user_ids,
            }) => {
                assert_eq!(group_id, "g");
                assert_eq!(user_ids, vec!["u1", "u2"]);
            }

            command => panic!("unexpected {command:?}"),
        }

        let args =
            Args::try_parse_from(["scimcp", "users", "list"]).unwrap();
        match args.command {
            Command::Users(UsersCommand::List(list)) => {
                assert_eq!(list.count, 100);
                assert_eq!(list.start_index, 1);
                assert!(list.filter.is_none());
            }

            command => panic!("unexpected {command:?}"),
        }

        assert!(
            Args::try_parse_from([
                "scimcp",
                "users",
                "list",
                "--start-index",
                "0"
            ])
            .is_err()
        );
    }
}
