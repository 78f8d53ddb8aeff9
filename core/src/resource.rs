// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

/// The two SCIM resource types this crate provisions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceType {
    User,
    Group,
}

impl ResourceType {
    pub fn urn(&self) -> &'static str {
        match self {
            ResourceType::User => USER_URN,
            ResourceType::Group => GROUP_URN,
        }
    }

    /// The collection endpoint, relative to the base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ResourceType::User => "Users",
            ResourceType::Group => "Groups",
        }
    }

    /// The endpoint of a single resource, relative to the base URL.
    pub fn resource_endpoint(&self, id: &str) -> String {
        format!("{}/{}", self.endpoint(), id)
    }
}

// We match case exact here.
//
// RFC 7644
//
// resourceType
//     The name of the resource type of the resource.  This
//     attribute has a mutability of "readOnly" and "caseExact" as
//     "true".
impl std::str::FromStr for ResourceType {
    type Err = String;

    fn from_str(r: &str) -> Result<Self, Self::Err> {
        match r {
            "User" => Ok(ResourceType::User),
            "Group" => Ok(ResourceType::Group),
            _ => Err(format!("{r} not a valid resource type")),
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ResourceType::User => {
                write!(f, "User")
            }

            ResourceType::Group => {
                write!(f, "Group")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_endpoints() {
        assert_eq!(ResourceType::User.endpoint(), "Users");
        assert_eq!(ResourceType::Group.resource_endpoint("42"), "Groups/42");
    }

    #[test]
    fn test_resource_type_is_case_exact() {
        assert_eq!(ResourceType::from_str("User").unwrap(), ResourceType::User);
        assert!(ResourceType::from_str("user").is_err());
        assert_eq!(ResourceType::Group.to_string(), "Group");
    }
}
