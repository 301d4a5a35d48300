//! Bindings between account groups and policy collections

use super::{entity, problems};
use declarative::Cancellation;
use graphql::{Client, Request, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

macro_rules! binding_fields {
    () => {
        "id uuid name description autoDeploy schedule system \
         accountGroup { uuid } policyCollection { uuid } \
         executionConfig { dryRun securityContext variables }"
    };
}

const READ: &str = concat!(
    "query binding($uuid: String!) { binding(uuid: $uuid) { ",
    binding_fields!(),
    " } }"
);

const ADD: &str = concat!(
    "mutation addBinding($input: AddBindingInput!) { addBinding(input: $input) { binding { ",
    binding_fields!(),
    " } ",
    problems!(),
    " } }"
);

const UPDATE: &str = concat!(
    "mutation updateBinding($input: UpdateBindingInput!) { updateBinding(input: $input) { binding { ",
    binding_fields!(),
    " } ",
    problems!(),
    " } }"
);

const REMOVE: &str = concat!(
    "mutation removeBinding($uuid: String!) { removeBinding(uuid: $uuid) { binding { id } ",
    problems!(),
    " } }"
);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub id: String,
    pub uuid: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub auto_deploy: bool,
    pub schedule: Option<String>,
    #[serde(default)]
    pub system: bool,
    pub account_group: UuidRef,
    pub policy_collection: UuidRef,
    pub execution_config: Option<ExecutionConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UuidRef {
    pub uuid: String,
}

/// Execution settings; `dry_run` is only honored by newer control planes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    pub security_context: Option<String>,
    /// JSON document, as a string or an object
    pub variables: Option<Json>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "accountGroupUUID", skip_serializing_if = "Option::is_none")]
    pub account_group_uuid: Option<String>,
    #[serde(rename = "policyCollectionUUID", skip_serializing_if = "Option::is_none")]
    pub policy_collection_uuid: Option<String>,
    pub auto_deploy: Option<bool>,
    pub schedule: Option<String>,
    pub execution_config: Option<ExecutionConfig>,
}

pub struct Bindings<'a> {
    client: &'a Client,
}

impl<'a> Bindings<'a> {
    pub(super) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn read(&self, cancel: &Cancellation, uuid: &str) -> Result<Binding> {
        let request = Request::query("binding", READ).var("uuid", uuid)?;
        let data: Json = self.client.query(cancel, request)?;
        entity(data, "binding", format_args!("binding {uuid}"))
    }

    pub fn create(&self, cancel: &Cancellation, input: &BindingInput) -> Result<Binding> {
        let request = Request::mutation("addBinding", ADD).var("input", input)?;
        let payload: Json = self.client.mutate(cancel, request, "addBinding")?;
        entity(payload, "binding", format_args!("binding {}", input.name))
    }

    pub fn update(&self, cancel: &Cancellation, input: &BindingInput) -> Result<Binding> {
        let request = Request::mutation("updateBinding", UPDATE).var("input", input)?;
        let payload: Json = self.client.mutate(cancel, request, "updateBinding")?;
        entity(payload, "binding", format_args!("binding {}", input.name))
    }

    pub fn delete(&self, cancel: &Cancellation, uuid: &str) -> Result<()> {
        let request = Request::mutation("removeBinding", REMOVE).var("uuid", uuid)?;
        let _: Json = self.client.mutate(cancel, request, "removeBinding")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execution_config_without_dry_run() {
        let config: ExecutionConfig =
            serde_json::from_value(json!({"securityContext": "arn", "variables": "{}"})).unwrap();
        assert_eq!(config.dry_run, None);
        let sent = serde_json::to_value(&config).unwrap();
        assert!(sent.get("dryRun").is_none());
    }

    #[test]
    fn test_execution_config_with_dry_run() {
        let config: ExecutionConfig = serde_json::from_value(json!({"dryRun": true})).unwrap();
        assert_eq!(config.dry_run, Some(true));
        assert_eq!(serde_json::to_value(&config).unwrap()["dryRun"], json!(true));
    }
}
