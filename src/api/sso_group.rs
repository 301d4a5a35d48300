//! SSO group mappings

use super::{entity, problems};
use declarative::Cancellation;
use graphql::{Client, Request, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

macro_rules! group_fields {
    () => {
        "id name roles accountGroupUUIDs"
    };
}

const READ: &str = concat!(
    "query ssoGroup($name: String!) { ssoGroup(name: $name) { ",
    group_fields!(),
    " } }"
);

const ADD: &str = concat!(
    "mutation addSSOGroup($input: SSOGroupInput!) { addSSOGroup(input: $input) { group { ",
    group_fields!(),
    " } ",
    problems!(),
    " } }"
);

const UPDATE: &str = concat!(
    "mutation updateSSOGroup($input: SSOGroupInput!) { updateSSOGroup(input: $input) { group { ",
    group_fields!(),
    " } ",
    problems!(),
    " } }"
);

const REMOVE: &str = concat!(
    "mutation removeSSOGroup($name: String!) { removeSSOGroup(name: $name) { group { id } ",
    problems!(),
    " } }"
);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(rename = "accountGroupUUIDs", default)]
    pub account_group_uuids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SsoGroupInput {
    pub name: String,
    pub roles: Vec<String>,
    #[serde(rename = "accountGroupUUIDs")]
    pub account_group_uuids: Vec<String>,
}

pub struct SsoGroups<'a> {
    client: &'a Client,
}

impl<'a> SsoGroups<'a> {
    pub(super) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn read(&self, cancel: &Cancellation, name: &str) -> Result<SsoGroup> {
        let request = Request::query("ssoGroup", READ).var("name", name)?;
        let data: Json = self.client.query(cancel, request)?;
        entity(data, "ssoGroup", format_args!("SSO group {name}"))
    }

    pub fn create(&self, cancel: &Cancellation, input: &SsoGroupInput) -> Result<SsoGroup> {
        let request = Request::mutation("addSSOGroup", ADD).var("input", input)?;
        let payload: Json = self.client.mutate(cancel, request, "addSSOGroup")?;
        entity(payload, "group", format_args!("SSO group {}", input.name))
    }

    pub fn update(&self, cancel: &Cancellation, input: &SsoGroupInput) -> Result<SsoGroup> {
        let request = Request::mutation("updateSSOGroup", UPDATE).var("input", input)?;
        let payload: Json = self.client.mutate(cancel, request, "updateSSOGroup")?;
        entity(payload, "group", format_args!("SSO group {}", input.name))
    }

    pub fn delete(&self, cancel: &Cancellation, name: &str) -> Result<()> {
        let request = Request::mutation("removeSSOGroup", REMOVE).var("name", name)?;
        let _: Json = self.client.mutate(cancel, request, "removeSSOGroup")?;
        Ok(())
    }
}
