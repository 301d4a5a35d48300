//! Policy collection resource
//!
//! A collection is either static, with policies attached through mapping
//! resources, or dynamic, fed from a repository branch. Moving a collection
//! to another repository, or between static and dynamic, replaces it.

use super::{key, opt};
use crate::api::Api;
use crate::api::policy_collection::{PolicyCollection, PolicyCollectionInput, RepositoryView};
use crate::enums::normalize_provider;
use crate::validators::{ONE_OF_CLOUD_PROVIDERS, check_str};
use declarative::value::{list_or_null, nullable_string};
use declarative::{
    Attribute, Context, Diagnostic, ImportKeys, Resource, Result, Schema, Validator, Value,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

pub const TYPE_NAME: &str = "stacklet_policy_collection";

/// Repository source of a dynamic collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicConfig {
    pub repository_uuid: Value<String>,
    /// Remote default branch when unset
    pub branch_name: Value<String>,
    pub namespace: Value<String>,
    pub policy_directories: Value<Vec<String>>,
    pub policy_file_suffix: Value<Vec<String>>,
}

impl DynamicConfig {
    fn from_remote(view: RepositoryView, prior: Option<&Self>) -> Self {
        Self {
            repository_uuid: Value::Known(view.repository_uuid),
            branch_name: nullable_string(view.branch_name),
            namespace: nullable_string(view.namespace),
            policy_directories: list_or_null(
                view.policy_directories.unwrap_or_default(),
                prior.map(|p| &p.policy_directories),
            ),
            policy_file_suffix: list_or_null(
                view.policy_file_suffix.unwrap_or_default(),
                prior.map(|p| &p.policy_file_suffix),
            ),
        }
    }

    fn view(&self) -> Result<RepositoryView> {
        Ok(RepositoryView {
            repository_uuid: key(&self.repository_uuid, "dynamic_config.repository_uuid")?.to_string(),
            branch_name: opt(&self.branch_name),
            namespace: opt(&self.namespace),
            policy_directories: opt(&self.policy_directories),
            policy_file_suffix: opt(&self.policy_file_suffix),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyCollectionModel {
    pub id: Value<String>,
    pub uuid: Value<String>,
    pub name: Value<String>,
    pub description: Value<String>,
    pub provider: Value<String>,
    pub auto_update: Value<bool>,
    pub system: Value<bool>,
    pub dynamic_config: Value<DynamicConfig>,
}

impl PolicyCollectionModel {
    fn from_remote(collection: PolicyCollection, prior: Option<&Self>) -> Self {
        let prior_dynamic = prior.and_then(|p| p.dynamic_config.as_known());
        Self {
            id: Value::Known(collection.id),
            uuid: Value::Known(collection.uuid),
            name: Value::Known(collection.name),
            description: nullable_string(collection.description),
            provider: Value::from_option(collection.provider.map(|p| p.to_string())),
            auto_update: Value::Known(collection.auto_update),
            system: Value::Known(collection.system),
            dynamic_config: Value::from_option(
                collection
                    .repository_view
                    .map(|view| DynamicConfig::from_remote(view, prior_dynamic)),
            ),
        }
    }

    fn input(&self, uuid: Option<String>) -> Result<PolicyCollectionInput> {
        Ok(PolicyCollectionInput {
            uuid,
            name: key(&self.name, "name")?.to_string(),
            description: opt(&self.description),
            provider: opt(&self.provider),
            auto_update: opt(&self.auto_update),
            repository_view: self.dynamic_config.as_known().map(DynamicConfig::view).transpose()?,
        })
    }
}

fn no_auto_update() -> Json {
    Json::Bool(false)
}

pub struct PolicyCollectionResource {
    api: Api,
}

impl PolicyCollectionResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

impl Resource for PolicyCollectionResource {
    type Model = PolicyCollectionModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new(TYPE_NAME)
            .attr(Attribute::computed("id").use_state())
            .attr(Attribute::computed("uuid").use_state())
            .attr(Attribute::required("name").validate(Validator::NotBlank))
            .attr(Attribute::optional("description"))
            .attr(
                Attribute::optional("provider")
                    .replace()
                    .normalize(normalize_provider)
                    .validate(ONE_OF_CLOUD_PROVIDERS),
            )
            .attr(Attribute::optional("auto_update").default(no_auto_update))
            .attr(Attribute::computed("system").use_state())
            .attr(
                Attribute::optional("dynamic_config")
                    .replace_if_fields_changed(&["repository_uuid"])
                    .replace_if_null_string_change(),
            )
    }

    fn import_keys(&self) -> ImportKeys {
        ImportKeys::new(&["uuid"])
    }

    fn validate(&self, config: &PolicyCollectionModel) -> Vec<Diagnostic> {
        let Some(dynamic) = config.dynamic_config.as_known() else {
            return Vec::new();
        };
        if dynamic.repository_uuid.is_null() {
            return vec![
                Diagnostic::error("Missing required argument", "the argument \"repository_uuid\" is required")
                    .at("dynamic_config.repository_uuid"),
            ];
        }
        check_str(Validator::Uuid, "dynamic_config.repository_uuid", &dynamic.repository_uuid)
    }

    /// An unset branch or namespace follows whatever the remote chose for the
    /// same repository
    fn modify_plan(
        &self,
        planned: &mut PolicyCollectionModel,
        prior: Option<&PolicyCollectionModel>,
        _config: &PolicyCollectionModel,
    ) -> Result<()> {
        let Value::Known(dynamic) = &mut planned.dynamic_config else {
            return Ok(());
        };
        let prior = prior
            .and_then(|p| p.dynamic_config.as_known())
            .filter(|p| p.repository_uuid == dynamic.repository_uuid);
        if dynamic.branch_name.is_null() {
            dynamic.branch_name = prior.map_or(Value::Unknown, |p| p.branch_name.clone());
        }
        if dynamic.namespace.is_null() {
            dynamic.namespace = prior.map_or(Value::Unknown, |p| p.namespace.clone());
        }
        Ok(())
    }

    fn read(&self, ctx: &Context, state: &PolicyCollectionModel) -> Result<Option<PolicyCollectionModel>> {
        let collection = self.api.policy_collections().read(&ctx.cancel, key(&state.uuid, "uuid")?)?;
        Ok(Some(PolicyCollectionModel::from_remote(collection, Some(state))))
    }

    fn create(
        &self,
        ctx: &Context,
        planned: &PolicyCollectionModel,
        _config: &PolicyCollectionModel,
    ) -> Result<PolicyCollectionModel> {
        let collection = self.api.policy_collections().create(&ctx.cancel, &planned.input(None)?)?;
        log::info!("created policy collection {} ({})", collection.name, collection.uuid);
        Ok(PolicyCollectionModel::from_remote(collection, Some(planned)))
    }

    fn update(
        &self,
        ctx: &Context,
        prior: &PolicyCollectionModel,
        planned: &PolicyCollectionModel,
        _config: &PolicyCollectionModel,
    ) -> Result<PolicyCollectionModel> {
        let uuid = key(&prior.uuid, "uuid")?.to_string();
        let collection = self.api.policy_collections().update(&ctx.cancel, &planned.input(Some(uuid))?)?;
        Ok(PolicyCollectionModel::from_remote(collection, Some(planned)))
    }

    fn delete(&self, ctx: &Context, state: &PolicyCollectionModel) -> Result<()> {
        self.api.policy_collections().delete(&ctx.cancel, key(&state.uuid, "uuid")?)?;
        Ok(())
    }

    fn import(&self, id: &str) -> Result<PolicyCollectionModel> {
        Ok(PolicyCollectionModel {
            uuid: Value::Known(self.import_keys().values(id)?.remove(0)),
            ..PolicyCollectionModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{self, COLLECTION_UUID, REPOSITORY_UUID};
    use declarative::{Action, DynResource, Error};
    use serde_json::json;

    fn dynamic_remote(branch: &str) -> Json {
        json!({
            "id": "pc-1", "uuid": COLLECTION_UUID, "name": "cis", "description": null, "provider": "AWS",
            "autoUpdate": true, "system": false,
            "repositoryView": {"repositoryUUID": REPOSITORY_UUID, "branchName": branch, "namespace": "",
                               "policyDirectories": ["policies"], "policyFileSuffix": null}
        })
    }

    fn dynamic_state() -> Json {
        json!({
            "id": "pc-1", "uuid": COLLECTION_UUID, "name": "cis", "description": null, "provider": "AWS",
            "auto_update": true, "system": false,
            "dynamic_config": {"repository_uuid": REPOSITORY_UUID, "branch_name": "main", "namespace": "",
                               "policy_directories": ["policies"], "policy_file_suffix": null}
        })
    }

    #[test]
    fn test_create_static_collection() {
        let (api, mock) = testing::api();
        mock.reply(
            "addPolicyCollection",
            json!({"addPolicyCollection": {"collection": {
                "id": "pc-1", "uuid": COLLECTION_UUID, "name": "cis", "description": null,
                "provider": "AWS", "autoUpdate": false, "system": false, "repositoryView": null
            }}}),
        );
        let resource = PolicyCollectionResource::new(api);
        let config = json!({"name": "cis", "provider": "aws"});
        let change = resource.plan(Some(&config), None).unwrap();
        assert_eq!(change.planned.as_ref().unwrap()["auto_update"], json!(false));
        let state = resource.apply(&Context::new(), &change, Some(&config), None).unwrap().unwrap();
        assert_eq!(state["uuid"], json!(COLLECTION_UUID));
        assert_eq!(state["dynamic_config"], Json::Null);

        let input = mock.requests()[0].variable("input").cloned().unwrap();
        assert_eq!(input["repositoryView"], Json::Null);
        assert!(input.get("uuid").is_none());

        assert_eq!(resource.plan(Some(&config), Some(&state)).unwrap().action, Action::NoOp);
    }

    #[test]
    fn test_remote_default_branch_is_stable() {
        let (api, mock) = testing::api();
        mock.reply("addPolicyCollection", json!({"addPolicyCollection": {"collection": dynamic_remote("main")}}));
        let resource = PolicyCollectionResource::new(api);
        let config = json!({
            "name": "cis", "provider": "AWS", "auto_update": true,
            "dynamic_config": {"repository_uuid": REPOSITORY_UUID, "namespace": "", "policy_directories": ["policies"]}
        });
        let change = resource.plan(Some(&config), None).unwrap();
        let planned = change.planned.clone().unwrap();
        assert_eq!(planned["dynamic_config"]["branch_name"], json!({"$unknown": true}));

        let state = resource.apply(&Context::new(), &change, Some(&config), None).unwrap().unwrap();
        assert_eq!(state, dynamic_state());
        let input = mock.requests()[0].variable("input").cloned().unwrap();
        assert_eq!(input["repositoryView"]["branchName"], Json::Null);

        assert_eq!(resource.plan(Some(&config), Some(&state)).unwrap().action, Action::NoOp);
    }

    #[test]
    fn test_repository_change_replaces() {
        let (api, _) = testing::api();
        let resource = PolicyCollectionResource::new(api);
        let config = json!({
            "name": "cis", "provider": "AWS", "auto_update": true,
            "dynamic_config": {"repository_uuid": "55555555-5555-5555-5555-555555555555", "namespace": ""}
        });
        let change = resource.plan(Some(&config), Some(&dynamic_state())).unwrap();
        assert_eq!(change.action, Action::Replace);
        assert_eq!(change.replace_paths, vec!["dynamic_config"]);
        // re-planned as a fresh collection
        assert_eq!(change.planned.unwrap()["uuid"], json!({"$unknown": true}));
    }

    #[test]
    fn test_branch_change_updates_in_place() {
        let (api, mock) = testing::api();
        mock.reply(
            "updatePolicyCollection",
            json!({"updatePolicyCollection": {"collection": dynamic_remote("release")}}),
        );
        let resource = PolicyCollectionResource::new(api);
        let prior = dynamic_state();
        let config = json!({
            "name": "cis", "provider": "AWS", "auto_update": true,
            "dynamic_config": {"repository_uuid": REPOSITORY_UUID, "branch_name": "release", "namespace": "",
                               "policy_directories": ["policies"]}
        });
        let change = resource.plan(Some(&config), Some(&prior)).unwrap();
        assert_eq!(change.action, Action::Update);
        let state = resource.apply(&Context::new(), &change, Some(&config), Some(&prior)).unwrap().unwrap();
        assert_eq!(state["dynamic_config"]["branch_name"], json!("release"));
        let input = mock.requests()[0].variable("input").cloned().unwrap();
        assert_eq!(input["uuid"], json!(COLLECTION_UUID));
    }

    #[test]
    fn test_dropping_dynamic_config_replaces() {
        let (api, _) = testing::api();
        let resource = PolicyCollectionResource::new(api);
        let config = json!({"name": "cis", "provider": "AWS", "auto_update": true});
        let change = resource.plan(Some(&config), Some(&dynamic_state())).unwrap();
        assert_eq!(change.action, Action::Replace);
    }

    #[test]
    fn test_invalid_repository_uuid() {
        let (api, _) = testing::api();
        let resource = PolicyCollectionResource::new(api);
        let config = json!({"name": "cis", "dynamic_config": {"repository_uuid": "nope"}});
        let err = resource.plan(Some(&config), None).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ref d) if d[0].path.as_deref() == Some("dynamic_config.repository_uuid")
        ));

        let config = json!({"name": "cis", "dynamic_config": {"branch_name": "main"}});
        assert!(matches!(resource.plan(Some(&config), None), Err(Error::Validation(_))));
    }
}
