//! Account groups and their account mappings

use super::{entity, problems};
use crate::enums::CloudProvider;
use declarative::Cancellation;
use graphql::{Client, Request, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

macro_rules! group_fields {
    () => {
        "id uuid name description provider regions dynamicFilter"
    };
}

macro_rules! mapping_fields {
    () => {
        "id groupUUID accountKey"
    };
}

const READ: &str = concat!(
    "query accountGroup($uuid: String!) { accountGroup(uuid: $uuid) { ",
    group_fields!(),
    " } }"
);

const ADD: &str = concat!(
    "mutation addAccountGroup($input: AddAccountGroupInput!) { addAccountGroup(input: $input) { group { ",
    group_fields!(),
    " } ",
    problems!(),
    " } }"
);

const UPDATE: &str = concat!(
    "mutation updateAccountGroup($input: UpdateAccountGroupInput!) { updateAccountGroup(input: $input) { group { ",
    group_fields!(),
    " } ",
    problems!(),
    " } }"
);

const REMOVE: &str = concat!(
    "mutation removeAccountGroup($uuid: String!) { removeAccountGroup(uuid: $uuid) { group { id } ",
    problems!(),
    " } }"
);

const READ_MAPPING: &str = concat!(
    "query accountGroupMapping($groupUUID: String!, $accountKey: String!) { accountGroupMapping(groupUUID: $groupUUID, accountKey: $accountKey) { ",
    mapping_fields!(),
    " } }"
);

const ADD_MAPPING: &str = concat!(
    "mutation addAccountGroupMappings($input: AddAccountGroupMappingsInput!) { addAccountGroupMappings(input: $input) { mappings { ",
    mapping_fields!(),
    " } ",
    problems!(),
    " } }"
);

const REMOVE_MAPPING: &str = concat!(
    "mutation removeAccountGroupMappings($ids: [ID!]!) { removeAccountGroupMappings(ids: $ids) { removed ",
    problems!(),
    " } }"
);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountGroup {
    pub id: String,
    pub uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub provider: CloudProvider,
    #[serde(default)]
    pub regions: Option<Vec<String>>,
    pub dynamic_filter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountGroupInput {
    /// Set on update only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub name: String,
    pub description: Option<String>,
    /// Set on create only; the provider of a group is fixed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub regions: Option<Vec<String>>,
    pub dynamic_filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountGroupMapping {
    pub id: String,
    #[serde(rename = "groupUUID")]
    pub group_uuid: String,
    pub account_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MappingInput<'a> {
    #[serde(rename = "groupUUID")]
    group_uuid: &'a str,
    account_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct MappingsPayload {
    #[serde(default)]
    mappings: Vec<AccountGroupMapping>,
}

pub struct AccountGroups<'a> {
    client: &'a Client,
}

impl<'a> AccountGroups<'a> {
    pub(super) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn read(&self, cancel: &Cancellation, uuid: &str) -> Result<AccountGroup> {
        let request = Request::query("accountGroup", READ).var("uuid", uuid)?;
        let data: Json = self.client.query(cancel, request)?;
        entity(data, "accountGroup", format_args!("account group {uuid}"))
    }

    pub fn create(&self, cancel: &Cancellation, input: &AccountGroupInput) -> Result<AccountGroup> {
        let request = Request::mutation("addAccountGroup", ADD).var("input", input)?;
        let payload: Json = self.client.mutate(cancel, request, "addAccountGroup")?;
        entity(payload, "group", format_args!("account group {}", input.name))
    }

    pub fn update(&self, cancel: &Cancellation, input: &AccountGroupInput) -> Result<AccountGroup> {
        let request = Request::mutation("updateAccountGroup", UPDATE).var("input", input)?;
        let payload: Json = self.client.mutate(cancel, request, "updateAccountGroup")?;
        entity(payload, "group", format_args!("account group {}", input.name))
    }

    pub fn delete(&self, cancel: &Cancellation, uuid: &str) -> Result<()> {
        let request = Request::mutation("removeAccountGroup", REMOVE).var("uuid", uuid)?;
        let _: Json = self.client.mutate(cancel, request, "removeAccountGroup")?;
        Ok(())
    }

    pub fn read_mapping(&self, cancel: &Cancellation, group_uuid: &str, account_key: &str) -> Result<AccountGroupMapping> {
        let request = Request::query("accountGroupMapping", READ_MAPPING)
            .var("groupUUID", group_uuid)?
            .var("accountKey", account_key)?;
        let data: Json = self.client.query(cancel, request)?;
        entity(
            data,
            "accountGroupMapping",
            format_args!("account {account_key} in group {group_uuid}"),
        )
    }

    pub fn create_mapping(&self, cancel: &Cancellation, group_uuid: &str, account_key: &str) -> Result<AccountGroupMapping> {
        let input = serde_json::json!({
            "mappings": [MappingInput { group_uuid, account_key }],
        });
        let request = Request::mutation("addAccountGroupMappings", ADD_MAPPING).var("input", input)?;
        let payload: MappingsPayload = self.client.mutate(cancel, request, "addAccountGroupMappings")?;
        payload
            .mappings
            .into_iter()
            .find(|m| m.group_uuid == group_uuid && m.account_key == account_key)
            .ok_or_else(|| graphql::Error::NotFound(format!("account {account_key} in group {group_uuid}")))
    }

    pub fn delete_mapping(&self, cancel: &Cancellation, id: &str) -> Result<()> {
        let request = Request::mutation("removeAccountGroupMappings", REMOVE_MAPPING).var("ids", [id])?;
        let _: Json = self.client.mutate(cancel, request, "removeAccountGroupMappings")?;
        Ok(())
    }
}
