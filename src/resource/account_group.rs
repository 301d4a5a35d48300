//! Account group resource - a named set of accounts of one provider

use super::{key, list, opt};
use crate::api::Api;
use crate::api::account_group::{AccountGroup, AccountGroupInput};
use crate::enums::normalize_provider;
use crate::validators::ONE_OF_CLOUD_PROVIDERS;
use declarative::value::{list_or_null, nullable_string};
use declarative::{Attribute, Context, ImportKeys, Resource, Result, Schema, Validator, Value};
use serde::{Deserialize, Serialize};

pub const TYPE_NAME: &str = "stacklet_account_group";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountGroupModel {
    pub id: Value<String>,
    pub uuid: Value<String>,
    pub name: Value<String>,
    pub description: Value<String>,
    pub provider: Value<String>,
    pub regions: Value<Vec<String>>,
    pub dynamic_filter: Value<String>,
}

impl AccountGroupModel {
    fn from_remote(group: AccountGroup, prior: Option<&Self>) -> Self {
        Self {
            id: Value::Known(group.id),
            uuid: Value::Known(group.uuid),
            name: Value::Known(group.name),
            description: nullable_string(group.description),
            provider: Value::Known(group.provider.to_string()),
            regions: list_or_null(group.regions.unwrap_or_default(), prior.map(|p| &p.regions)),
            dynamic_filter: nullable_string(group.dynamic_filter),
        }
    }

    fn input(&self, uuid: Option<String>) -> Result<AccountGroupInput> {
        let creating = uuid.is_none();
        Ok(AccountGroupInput {
            uuid,
            name: key(&self.name, "name")?.to_string(),
            description: opt(&self.description),
            provider: if creating {
                Some(key(&self.provider, "provider")?.to_string())
            } else {
                None
            },
            regions: Some(list(&self.regions)),
            dynamic_filter: opt(&self.dynamic_filter),
        })
    }
}

pub struct AccountGroupResource {
    api: Api,
}

impl AccountGroupResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

impl Resource for AccountGroupResource {
    type Model = AccountGroupModel;

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
                Attribute::required("provider")
                    .replace()
                    .normalize(normalize_provider)
                    .validate(ONE_OF_CLOUD_PROVIDERS),
            )
            .attr(Attribute::optional("regions"))
            .attr(Attribute::optional("dynamic_filter").replace_if_null_string_change())
    }

    fn import_keys(&self) -> ImportKeys {
        ImportKeys::new(&["uuid"])
    }

    fn read(&self, ctx: &Context, state: &AccountGroupModel) -> Result<Option<AccountGroupModel>> {
        let group = self.api.account_groups().read(&ctx.cancel, key(&state.uuid, "uuid")?)?;
        Ok(Some(AccountGroupModel::from_remote(group, Some(state))))
    }

    fn create(&self, ctx: &Context, planned: &AccountGroupModel, _config: &AccountGroupModel) -> Result<AccountGroupModel> {
        let group = self.api.account_groups().create(&ctx.cancel, &planned.input(None)?)?;
        log::info!("created account group {} ({})", group.name, group.uuid);
        Ok(AccountGroupModel::from_remote(group, Some(planned)))
    }

    fn update(
        &self,
        ctx: &Context,
        prior: &AccountGroupModel,
        planned: &AccountGroupModel,
        _config: &AccountGroupModel,
    ) -> Result<AccountGroupModel> {
        let uuid = key(&prior.uuid, "uuid")?.to_string();
        let group = self.api.account_groups().update(&ctx.cancel, &planned.input(Some(uuid))?)?;
        Ok(AccountGroupModel::from_remote(group, Some(planned)))
    }

    fn delete(&self, ctx: &Context, state: &AccountGroupModel) -> Result<()> {
        self.api.account_groups().delete(&ctx.cancel, key(&state.uuid, "uuid")?)?;
        Ok(())
    }

    fn import(&self, id: &str) -> Result<AccountGroupModel> {
        let uuid = self.import_keys().values(id)?.remove(0);
        Ok(AccountGroupModel {
            uuid: Value::Known(uuid),
            ..AccountGroupModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{self, GROUP_UUID};
    use declarative::{Action, DynResource};
    use serde_json::json;

    fn remote(regions: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "g-1", "uuid": GROUP_UUID, "name": "prod", "description": null,
            "provider": "AWS", "regions": regions, "dynamicFilter": null
        })
    }

    #[test]
    fn test_empty_regions_stay_null() {
        let (api, mock) = testing::api();
        mock.reply("addAccountGroup", json!({"addAccountGroup": {"group": remote(json!([]))}}));
        let resource = AccountGroupResource::new(api);
        let config = json!({"name": "prod", "provider": "aws"});
        let change = resource.plan(Some(&config), None).unwrap();
        let state = resource.apply(&Context::new(), &change, Some(&config), None).unwrap().unwrap();
        assert_eq!(state["regions"], serde_json::Value::Null);
        assert_eq!(state["uuid"], json!(GROUP_UUID));

        let input = mock.requests()[0].variable("input").cloned().unwrap();
        assert_eq!(input["provider"], json!("AWS"));
        assert_eq!(input["regions"], json!([]));

        let again = resource.plan(Some(&config), Some(&state)).unwrap();
        assert_eq!(again.action, Action::NoOp);
    }

    #[test]
    fn test_update_keeps_uuid() {
        let (api, mock) = testing::api();
        mock.reply(
            "updateAccountGroup",
            json!({"updateAccountGroup": {"group": remote(json!(["us-east-1"]))}}),
        );
        let resource = AccountGroupResource::new(api);
        let prior = json!({
            "id": "g-1", "uuid": GROUP_UUID, "name": "prod", "description": null,
            "provider": "AWS", "regions": null, "dynamic_filter": null
        });
        let config = json!({"name": "prod", "provider": "AWS", "regions": ["us-east-1"]});
        let change = resource.plan(Some(&config), Some(&prior)).unwrap();
        assert_eq!(change.action, Action::Update);
        let state = resource.apply(&Context::new(), &change, Some(&config), Some(&prior)).unwrap().unwrap();
        assert_eq!(state["regions"], json!(["us-east-1"]));
        let input = mock.requests()[0].variable("input").cloned().unwrap();
        assert_eq!(input["uuid"], json!(GROUP_UUID));
    }

    #[test]
    fn test_provider_change_replaces() {
        let (api, _) = testing::api();
        let resource = AccountGroupResource::new(api);
        let prior = json!({"id": "g-1", "uuid": GROUP_UUID, "name": "prod", "provider": "AWS"});
        let change = resource
            .plan(Some(&json!({"name": "prod", "provider": "gcp"})), Some(&prior))
            .unwrap();
        assert_eq!(change.action, Action::Replace);
        assert_eq!(change.planned.unwrap()["uuid"], json!({"$unknown": true}));
    }
}
