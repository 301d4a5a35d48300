//! Binding resource - runs a policy collection against an account group

use super::{key, opt};
use crate::api::Api;
use crate::api::binding::{Binding, BindingInput, ExecutionConfig};
use declarative::value::{nullable_bool, nullable_string};
use declarative::{
    Attribute, Context, Diagnostic, Error, ImportKeys, Resource, Result, Schema, Validator, Value, json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

pub const TYPE_NAME: &str = "stacklet_binding";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingExecutionConfig {
    pub dry_run: Value<bool>,
    pub security_context: Value<String>,
    pub variables: Value<String>,
}

impl BindingExecutionConfig {
    fn from_remote(config: ExecutionConfig) -> Result<Self> {
        Ok(Self {
            dry_run: nullable_bool(config.dry_run),
            security_context: nullable_string(config.security_context),
            variables: json::from_api(config.variables.as_ref())?,
        })
    }

    fn is_empty(&self) -> bool {
        self.dry_run.is_null() && self.security_context.is_null() && self.variables.is_null()
    }

    fn input(&self) -> ExecutionConfig {
        ExecutionConfig {
            dry_run: opt(&self.dry_run),
            security_context: opt(&self.security_context),
            variables: opt(&self.variables).map(Json::String),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingModel {
    pub id: Value<String>,
    pub uuid: Value<String>,
    pub name: Value<String>,
    pub description: Value<String>,
    pub account_group_uuid: Value<String>,
    pub policy_collection_uuid: Value<String>,
    pub auto_deploy: Value<bool>,
    pub schedule: Value<String>,
    pub system: Value<bool>,
    pub execution_config: Value<BindingExecutionConfig>,
}

impl BindingModel {
    fn from_remote(binding: Binding, prior: Option<&Self>) -> Result<Self> {
        let execution_config = match binding.execution_config {
            Some(config) => BindingExecutionConfig::from_remote(config)?,
            None => BindingExecutionConfig::default(),
        };
        // an all-null block the remote fills in is the same as no block
        let prior_had_block = prior.is_some_and(|p| !p.execution_config.is_null());
        let execution_config = if execution_config.is_empty() && !prior_had_block {
            Value::Null
        } else {
            Value::Known(execution_config)
        };

        Ok(Self {
            id: Value::Known(binding.id),
            uuid: Value::Known(binding.uuid),
            name: Value::Known(binding.name),
            description: nullable_string(binding.description),
            account_group_uuid: Value::Known(binding.account_group.uuid),
            policy_collection_uuid: Value::Known(binding.policy_collection.uuid),
            auto_deploy: Value::Known(binding.auto_deploy),
            schedule: nullable_string(binding.schedule),
            system: Value::Known(binding.system),
            execution_config,
        })
    }

    fn input(&self, uuid: Option<String>) -> Result<BindingInput> {
        let creating = uuid.is_none();
        let (account_group_uuid, policy_collection_uuid) = if creating {
            (
                Some(key(&self.account_group_uuid, "account_group_uuid")?.to_string()),
                Some(key(&self.policy_collection_uuid, "policy_collection_uuid")?.to_string()),
            )
        } else {
            (None, None)
        };
        Ok(BindingInput {
            uuid,
            name: key(&self.name, "name")?.to_string(),
            description: opt(&self.description),
            account_group_uuid,
            policy_collection_uuid,
            auto_deploy: opt(&self.auto_deploy),
            schedule: opt(&self.schedule),
            execution_config: self.execution_config.as_known().map(BindingExecutionConfig::input),
        })
    }
}

fn no_auto_deploy() -> Json {
    Json::Bool(false)
}

pub struct BindingResource {
    api: Api,
}

impl BindingResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

impl Resource for BindingResource {
    type Model = BindingModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new(TYPE_NAME)
            .attr(Attribute::computed("id").use_state())
            .attr(Attribute::computed("uuid").use_state())
            .attr(Attribute::required("name").validate(Validator::NotBlank))
            .attr(Attribute::optional("description"))
            .attr(Attribute::required("account_group_uuid").replace().validate(Validator::Uuid))
            .attr(Attribute::required("policy_collection_uuid").replace().validate(Validator::Uuid))
            .attr(Attribute::optional("auto_deploy").default(no_auto_deploy))
            .attr(Attribute::optional("schedule").trim())
            .attr(Attribute::computed("system").use_state())
            .attr(Attribute::optional("execution_config"))
    }

    fn import_keys(&self) -> ImportKeys {
        ImportKeys::new(&["uuid"])
    }

    fn validate(&self, config: &BindingModel) -> Vec<Diagnostic> {
        config
            .execution_config
            .as_known()
            .map(|c| crate::validators::check_str(Validator::Json, "execution_config.variables", &c.variables))
            .unwrap_or_default()
    }

    /// Nested variables compare as documents
    fn modify_plan(&self, planned: &mut BindingModel, _prior: Option<&BindingModel>, _config: &BindingModel) -> Result<()> {
        if let Value::Known(config) = &mut planned.execution_config {
            config.variables = json::json_string(&config.variables)
                .map_err(|e| Error::invalid("execution_config.variables", format!("value is not valid JSON: {e}")))?;
        }
        Ok(())
    }

    fn read(&self, ctx: &Context, state: &BindingModel) -> Result<Option<BindingModel>> {
        let binding = self.api.bindings().read(&ctx.cancel, key(&state.uuid, "uuid")?)?;
        BindingModel::from_remote(binding, Some(state)).map(Some)
    }

    fn create(&self, ctx: &Context, planned: &BindingModel, _config: &BindingModel) -> Result<BindingModel> {
        let binding = self.api.bindings().create(&ctx.cancel, &planned.input(None)?)?;
        log::info!("created binding {} ({})", binding.name, binding.uuid);
        BindingModel::from_remote(binding, Some(planned))
    }

    fn update(
        &self,
        ctx: &Context,
        prior: &BindingModel,
        planned: &BindingModel,
        _config: &BindingModel,
    ) -> Result<BindingModel> {
        let uuid = key(&prior.uuid, "uuid")?.to_string();
        let binding = self.api.bindings().update(&ctx.cancel, &planned.input(Some(uuid))?)?;
        BindingModel::from_remote(binding, Some(planned))
    }

    fn delete(&self, ctx: &Context, state: &BindingModel) -> Result<()> {
        self.api.bindings().delete(&ctx.cancel, key(&state.uuid, "uuid")?)?;
        Ok(())
    }

    fn import(&self, id: &str) -> Result<BindingModel> {
        Ok(BindingModel {
            uuid: Value::Known(self.import_keys().values(id)?.remove(0)),
            ..BindingModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{self, COLLECTION_UUID, GROUP_UUID};
    use declarative::{Action, DynResource};
    use serde_json::json;

    const BINDING_UUID: &str = "66666666-6666-6666-6666-666666666666";

    fn remote(execution_config: Json) -> Json {
        json!({
            "id": "b-1", "uuid": BINDING_UUID, "name": "prod-cis", "description": null,
            "autoDeploy": true, "schedule": "0 */12 * * *", "system": false,
            "accountGroup": {"uuid": GROUP_UUID}, "policyCollection": {"uuid": COLLECTION_UUID},
            "executionConfig": execution_config
        })
    }

    fn config() -> Json {
        json!({
            "name": "prod-cis", "account_group_uuid": GROUP_UUID, "policy_collection_uuid": COLLECTION_UUID,
            "auto_deploy": true, "schedule": "0 */12 * * *",
            "execution_config": {"dry_run": true, "variables": "{ \"env\": \"prod\" }"}
        })
    }

    #[test]
    fn test_create_with_execution_config() {
        let (api, mock) = testing::api();
        mock.reply(
            "addBinding",
            json!({"addBinding": {"binding": remote(json!({"dryRun": true, "securityContext": null, "variables": {"env": "prod"}}))}}),
        );
        let resource = BindingResource::new(api);
        let change = resource.plan(Some(&config()), None).unwrap();
        let planned = change.planned.clone().unwrap();
        assert_eq!(planned["execution_config"]["variables"], json!(r#"{"env":"prod"}"#));

        let state = resource.apply(&Context::new(), &change, Some(&config()), None).unwrap().unwrap();
        assert_eq!(state["execution_config"]["variables"], json!(r#"{"env":"prod"}"#));
        assert_eq!(state["execution_config"]["dry_run"], json!(true));

        let input = mock.requests()[0].variable("input").cloned().unwrap();
        assert_eq!(input["accountGroupUUID"], json!(GROUP_UUID));
        assert_eq!(input["executionConfig"]["dryRun"], json!(true));

        assert_eq!(resource.plan(Some(&config()), Some(&state)).unwrap().action, Action::NoOp);
    }

    #[test]
    fn test_empty_remote_execution_config_stays_null() {
        let (api, mock) = testing::api();
        mock.reply(
            "binding",
            json!({"binding": remote(json!({"securityContext": null, "variables": null}))}),
        );
        let resource = BindingResource::new(api);
        let state = resource
            .refresh(&Context::new(), &json!({"uuid": BINDING_UUID}))
            .unwrap()
            .unwrap();
        assert_eq!(state["execution_config"], Json::Null);
    }

    #[test]
    fn test_update_omits_references() {
        let (api, mock) = testing::api();
        mock.reply(
            "updateBinding",
            json!({"updateBinding": {"binding": remote(json!({"dryRun": false, "variables": "{\"env\":\"prod\"}"}))}}),
        );
        let resource = BindingResource::new(api);
        let prior = json!({
            "id": "b-1", "uuid": BINDING_UUID, "name": "prod-cis", "description": null,
            "account_group_uuid": GROUP_UUID, "policy_collection_uuid": COLLECTION_UUID,
            "auto_deploy": true, "schedule": "0 */12 * * *", "system": false,
            "execution_config": {"dry_run": true, "security_context": null, "variables": "{\"env\":\"prod\"}"}
        });
        let mut config = config();
        config["execution_config"]["dry_run"] = json!(false);
        let change = resource.plan(Some(&config), Some(&prior)).unwrap();
        assert_eq!(change.action, Action::Update);
        resource.apply(&Context::new(), &change, Some(&config), Some(&prior)).unwrap();
        let input = mock.requests()[0].variable("input").cloned().unwrap();
        assert_eq!(input["uuid"], json!(BINDING_UUID));
        assert!(input.get("accountGroupUUID").is_none());
    }

    #[test]
    fn test_group_change_replaces() {
        let (api, _) = testing::api();
        let resource = BindingResource::new(api);
        let prior = json!({
            "id": "b-1", "uuid": BINDING_UUID, "name": "prod-cis",
            "account_group_uuid": "77777777-7777-7777-7777-777777777777",
            "policy_collection_uuid": COLLECTION_UUID, "auto_deploy": true, "system": false
        });
        let change = resource.plan(Some(&config()), Some(&prior)).unwrap();
        assert_eq!(change.action, Action::Replace);
        assert!(change.replace_paths.contains(&"account_group_uuid".to_string()));
    }

    #[test]
    fn test_invalid_variables_rejected() {
        let (api, _) = testing::api();
        let resource = BindingResource::new(api);
        let mut config = config();
        config["execution_config"]["variables"] = json!("{not json");
        assert!(matches!(resource.plan(Some(&config), None), Err(Error::Validation(_))));
    }
}
