//! Role assignments
//!
//! A (role, principal, target) triple. The list query has no server-side
//! filter for principals or targets, so listings page through every
//! assignment and filter on the client.

use super::problems;
use crate::enums::{PrincipalType, TargetType};
use declarative::Cancellation;
use graphql::{Client, Connection, Request, Result, paginate_filtered};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::fmt;

macro_rules! assignment_fields {
    () => {
        "id role { name } \
         principal { __typename ... on UserPrincipal { userID } ... on SSOGroupPrincipal { name } } \
         target { __typename ... on AccountGroupTarget { uuid } ... on PolicyCollectionTarget { uuid } ... on RepositoryTarget { uuid } }"
    };
}

const LIST: &str = concat!(
    "query roleAssignments($first: Int!, $after: String) { roleAssignments(first: $first, after: $after) { edges { node { ",
    assignment_fields!(),
    " } } pageInfo { hasNextPage endCursor } } }"
);

const ADD: &str = concat!(
    "mutation addRoleAssignment($input: AddRoleAssignmentInput!) { addRoleAssignment(input: $input) { roleAssignment { ",
    assignment_fields!(),
    " } ",
    problems!(),
    " } }"
);

const REMOVE: &str = concat!(
    "mutation removeRoleAssignment($id: ID!) { removeRoleAssignment(id: $id) { roleAssignment { id } ",
    problems!(),
    " } }"
);

const PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoleAssignment {
    pub id: String,
    pub role: RoleRef,
    pub principal: Principal,
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoleRef {
    pub name: String,
}

/// Who a role is granted to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "__typename")]
pub enum Principal {
    #[serde(rename = "UserPrincipal")]
    User {
        #[serde(rename = "userID")]
        id: String,
    },
    #[serde(rename = "SSOGroupPrincipal")]
    SsoGroup { name: String },
}

impl Principal {
    pub fn new(kind: PrincipalType, id: impl Into<String>) -> Self {
        match kind {
            PrincipalType::User => Self::User { id: id.into() },
            PrincipalType::SsoGroup => Self::SsoGroup { name: id.into() },
        }
    }

    pub fn kind(&self) -> PrincipalType {
        match self {
            Self::User { .. } => PrincipalType::User,
            Self::SsoGroup { .. } => PrincipalType::SsoGroup,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::User { id } => id,
            Self::SsoGroup { name } => name,
        }
    }
}

/// Wire form, e.g. `user:42`
impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// What a role is granted on
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "__typename")]
pub enum Target {
    #[serde(rename = "SystemTarget")]
    System,
    #[serde(rename = "AccountGroupTarget")]
    AccountGroup { uuid: String },
    #[serde(rename = "PolicyCollectionTarget")]
    PolicyCollection { uuid: String },
    #[serde(rename = "RepositoryTarget")]
    Repository { uuid: String },
}

impl Target {
    /// `id` is ignored for the system target
    pub fn new(kind: TargetType, id: Option<&str>) -> Self {
        let uuid = || id.unwrap_or_default().to_string();
        match kind {
            TargetType::System => Self::System,
            TargetType::AccountGroup => Self::AccountGroup { uuid: uuid() },
            TargetType::PolicyCollection => Self::PolicyCollection { uuid: uuid() },
            TargetType::Repository => Self::Repository { uuid: uuid() },
        }
    }

    pub fn kind(&self) -> TargetType {
        match self {
            Self::System => TargetType::System,
            Self::AccountGroup { .. } => TargetType::AccountGroup,
            Self::PolicyCollection { .. } => TargetType::PolicyCollection,
            Self::Repository { .. } => TargetType::Repository,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::System => None,
            Self::AccountGroup { uuid } | Self::PolicyCollection { uuid } | Self::Repository { uuid } => {
                Some(uuid)
            }
        }
    }
}

/// Wire form, e.g. `account-group:<uuid>` or `system:all`
impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id().unwrap_or("all"))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddInput {
    role_name: String,
    principal: String,
    target: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListData {
    role_assignments: Connection<RoleAssignment>,
}

pub struct RoleAssignments<'a> {
    client: &'a Client,
}

impl<'a> RoleAssignments<'a> {
    pub(super) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Every assignment matching the given target and principal
    pub fn list(
        &self,
        cancel: &Cancellation,
        target: Option<&Target>,
        principal: Option<&Principal>,
    ) -> Result<Vec<RoleAssignment>> {
        paginate_filtered(
            |cursor| {
                let request = Request::query("roleAssignments", LIST)
                    .var("first", PAGE_SIZE)?
                    .var("after", cursor)?;
                let data: ListData = self.client.query(cancel, request)?;
                Ok(data.role_assignments)
            },
            |a: &RoleAssignment| {
                target.is_none_or(|t| &a.target == t) && principal.is_none_or(|p| &a.principal == p)
            },
        )
    }

    /// Find one assignment by ID among those matching target and principal
    pub fn read(&self, cancel: &Cancellation, id: &str, target: &Target, principal: &Principal) -> Result<RoleAssignment> {
        self.list(cancel, Some(target), Some(principal))?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| graphql::Error::NotFound(format!("role assignment {id}")))
    }

    pub fn create(
        &self,
        cancel: &Cancellation,
        role_name: &str,
        principal: &Principal,
        target: &Target,
    ) -> Result<RoleAssignment> {
        let input = AddInput {
            role_name: role_name.to_string(),
            principal: principal.to_string(),
            target: target.to_string(),
        };
        let request = Request::mutation("addRoleAssignment", ADD).var("input", input)?;
        let payload: Json = self.client.mutate(cancel, request, "addRoleAssignment")?;
        super::entity(payload, "roleAssignment", format_args!("role assignment {role_name}"))
    }

    pub fn delete(&self, cancel: &Cancellation, id: &str) -> Result<()> {
        let request = Request::mutation("removeRoleAssignment", REMOVE).var("id", id)?;
        let _: Json = self.client.mutate(cancel, request, "removeRoleAssignment")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphql::MockTransport;
    use serde_json::json;

    fn node(id: &str, user: &str, group: &str) -> Json {
        json!({"node": {
            "id": id,
            "role": {"name": "viewer"},
            "principal": {"__typename": "UserPrincipal", "userID": user},
            "target": {"__typename": "AccountGroupTarget", "uuid": group}
        }})
    }

    #[test]
    fn test_list_filters_across_pages() {
        let mock = MockTransport::new();
        mock.reply(
            "roleAssignments",
            json!({"roleAssignments": {"edges": [node("a", "1", "g1"), node("b", "2", "g1")],
                   "pageInfo": {"hasNextPage": true, "endCursor": "c1"}}}),
        );
        mock.reply(
            "roleAssignments",
            json!({"roleAssignments": {"edges": [node("c", "1", "g2"), node("d", "1", "g1")],
                   "pageInfo": {"hasNextPage": false, "endCursor": null}}}),
        );
        let client = Client::new(mock.clone());
        let target = Target::new(TargetType::AccountGroup, Some("g1"));
        let principal = Principal::new(PrincipalType::User, "1");
        let found = RoleAssignments::new(&client)
            .list(&Cancellation::new(), Some(&target), Some(&principal))
            .unwrap();
        let ids: Vec<_> = found.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);

        let requests = mock.requests_for("roleAssignments");
        assert_eq!(requests[0].variable("after"), Some(&Json::Null));
        assert_eq!(requests[1].variable("after"), Some(&json!("c1")));
    }

    #[test]
    fn test_wire_forms() {
        assert_eq!(Target::new(TargetType::System, Some("ignored")).to_string(), "system:all");
        assert_eq!(
            Target::new(TargetType::Repository, Some("r")).to_string(),
            "repository:r"
        );
        assert_eq!(Principal::new(PrincipalType::SsoGroup, "admins").to_string(), "sso-group:admins");
    }

    #[test]
    fn test_system_target_decodes() {
        let target: Target = serde_json::from_value(json!({"__typename": "SystemTarget"})).unwrap();
        assert_eq!(target, Target::System);
        assert_eq!(target.id(), None);
    }
}
