// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::Deserialize;
use serde::Serialize;

mod client;
mod config;
mod dispatcher;
mod error;
mod generate;
mod group;
mod meta;
mod patch;
mod resource;
mod response;
mod tools;
mod user;

pub use client::*;
pub use config::*;
pub use dispatcher::*;
pub use error::*;
pub use generate::*;
pub use group::*;
pub use meta::*;
pub use patch::*;
pub use resource::*;
pub use response::*;
pub use tools::*;
pub use user::*;

pub const ERROR_URN: &str = "urn:ietf:params:scim:api:messages:2.0:Error";
pub const GROUP_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
pub const LISTRESPONSE_URN: &str =
    "urn:ietf:params:scim:api:messages:2.0:ListResponse";
pub const PATCHOP_URN: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";
pub const USER_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:User";

/// Attributes a caller sent that this crate does not model. They are kept
/// as-is and written back out next to the typed fields.
pub type Extra = serde_json::Map<String, serde_json::Value>;
