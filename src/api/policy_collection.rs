//! Policy collections and their policy mappings

use super::{entity, problems};
use crate::enums::CloudProvider;
use declarative::Cancellation;
use graphql::{Client, Request, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

macro_rules! collection_fields {
    () => {
        "id uuid name description provider autoUpdate system \
         repositoryView { repositoryUUID branchName namespace policyDirectories policyFileSuffix }"
    };
}

macro_rules! mapping_fields {
    () => {
        "id collectionUUID policyUUID policyVersion"
    };
}

const READ: &str = concat!(
    "query policyCollection($uuid: String!) { policyCollection(uuid: $uuid) { ",
    collection_fields!(),
    " } }"
);

const ADD: &str = concat!(
    "mutation addPolicyCollection($input: AddPolicyCollectionInput!) { addPolicyCollection(input: $input) { collection { ",
    collection_fields!(),
    " } ",
    problems!(),
    " } }"
);

const UPDATE: &str = concat!(
    "mutation updatePolicyCollection($input: UpdatePolicyCollectionInput!) { updatePolicyCollection(input: $input) { collection { ",
    collection_fields!(),
    " } ",
    problems!(),
    " } }"
);

const REMOVE: &str = concat!(
    "mutation removePolicyCollection($uuid: String!) { removePolicyCollection(uuid: $uuid) { collection { id } ",
    problems!(),
    " } }"
);

const READ_MAPPING: &str = concat!(
    "query policyCollectionMapping($collectionUUID: String!, $policyUUID: String!) { policyCollectionMapping(collectionUUID: $collectionUUID, policyUUID: $policyUUID) { ",
    mapping_fields!(),
    " } }"
);

const UPSERT_MAPPING: &str = concat!(
    "mutation upsertPolicyCollectionMappings($input: UpsertPolicyCollectionMappingsInput!) { upsertPolicyCollectionMappings(input: $input) { mappings { ",
    mapping_fields!(),
    " } ",
    problems!(),
    " } }"
);

const REMOVE_MAPPING: &str = concat!(
    "mutation removePolicyCollectionMappings($ids: [ID!]!) { removePolicyCollectionMappings(ids: $ids) { removed ",
    problems!(),
    " } }"
);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyCollection {
    pub id: String,
    pub uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub provider: Option<CloudProvider>,
    #[serde(default)]
    pub auto_update: bool,
    #[serde(default)]
    pub system: bool,
    /// Set for collections sourced from a repository
    pub repository_view: Option<RepositoryView>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryView {
    #[serde(rename = "repositoryUUID")]
    pub repository_uuid: String,
    pub branch_name: Option<String>,
    pub namespace: Option<String>,
    pub policy_directories: Option<Vec<String>>,
    pub policy_file_suffix: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyCollectionInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub provider: Option<String>,
    pub auto_update: Option<bool>,
    pub repository_view: Option<RepositoryView>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyCollectionMapping {
    pub id: String,
    #[serde(rename = "collectionUUID")]
    pub collection_uuid: String,
    #[serde(rename = "policyUUID")]
    pub policy_uuid: String,
    pub policy_version: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingInput {
    #[serde(rename = "collectionUUID")]
    pub collection_uuid: String,
    #[serde(rename = "policyUUID")]
    pub policy_uuid: String,
    /// Latest version when unset
    #[serde(rename = "policyVersion")]
    pub policy_version: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MappingsPayload {
    #[serde(default)]
    mappings: Vec<PolicyCollectionMapping>,
}

pub struct PolicyCollections<'a> {
    client: &'a Client,
}

impl<'a> PolicyCollections<'a> {
    pub(super) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn read(&self, cancel: &Cancellation, uuid: &str) -> Result<PolicyCollection> {
        let request = Request::query("policyCollection", READ).var("uuid", uuid)?;
        let data: Json = self.client.query(cancel, request)?;
        entity(data, "policyCollection", format_args!("policy collection {uuid}"))
    }

    pub fn create(&self, cancel: &Cancellation, input: &PolicyCollectionInput) -> Result<PolicyCollection> {
        let request = Request::mutation("addPolicyCollection", ADD).var("input", input)?;
        let payload: Json = self.client.mutate(cancel, request, "addPolicyCollection")?;
        entity(payload, "collection", format_args!("policy collection {}", input.name))
    }

    pub fn update(&self, cancel: &Cancellation, input: &PolicyCollectionInput) -> Result<PolicyCollection> {
        let request = Request::mutation("updatePolicyCollection", UPDATE).var("input", input)?;
        let payload: Json = self.client.mutate(cancel, request, "updatePolicyCollection")?;
        entity(payload, "collection", format_args!("policy collection {}", input.name))
    }

    pub fn delete(&self, cancel: &Cancellation, uuid: &str) -> Result<()> {
        let request = Request::mutation("removePolicyCollection", REMOVE).var("uuid", uuid)?;
        let _: Json = self.client.mutate(cancel, request, "removePolicyCollection")?;
        Ok(())
    }

    pub fn read_mapping(&self, cancel: &Cancellation, collection_uuid: &str, policy_uuid: &str) -> Result<PolicyCollectionMapping> {
        let request = Request::query("policyCollectionMapping", READ_MAPPING)
            .var("collectionUUID", collection_uuid)?
            .var("policyUUID", policy_uuid)?;
        let data: Json = self.client.query(cancel, request)?;
        entity(
            data,
            "policyCollectionMapping",
            format_args!("policy {policy_uuid} in collection {collection_uuid}"),
        )
    }

    /// Create or update one mapping
    pub fn upsert_mapping(&self, cancel: &Cancellation, input: &MappingInput) -> Result<PolicyCollectionMapping> {
        let request = Request::mutation("upsertPolicyCollectionMappings", UPSERT_MAPPING)
            .var("input", serde_json::json!({ "mappings": [input] }))?;
        let payload: MappingsPayload = self.client.mutate(cancel, request, "upsertPolicyCollectionMappings")?;
        payload
            .mappings
            .into_iter()
            .find(|m| m.collection_uuid == input.collection_uuid && m.policy_uuid == input.policy_uuid)
            .ok_or_else(|| {
                graphql::Error::NotFound(format!(
                    "policy {} in collection {}",
                    input.policy_uuid, input.collection_uuid
                ))
            })
    }

    pub fn delete_mapping(&self, cancel: &Cancellation, id: &str) -> Result<()> {
        let request = Request::mutation("removePolicyCollectionMappings", REMOVE_MAPPING).var("ids", [id])?;
        let _: Json = self.client.mutate(cancel, request, "removePolicyCollectionMappings")?;
        Ok(())
    }
}
