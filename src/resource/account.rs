//! Account resource - a cloud account registered with the platform

use super::{key, opt};
use crate::api::Api;
use crate::api::account::{Account, AccountInput};
use crate::enums::{CloudProvider, normalize_provider};
use crate::validators::ONE_OF_CLOUD_PROVIDERS;
use declarative::value::nullable_string;
use declarative::{Attribute, Context, Error, ImportKeys, Resource, Result, Schema, Value, json};
use serde::{Deserialize, Serialize};

pub const TYPE_NAME: &str = "stacklet_account";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountModel {
    pub id: Value<String>,
    pub key: Value<String>,
    pub name: Value<String>,
    pub short_name: Value<String>,
    pub description: Value<String>,
    pub provider: Value<String>,
    pub path: Value<String>,
    pub email: Value<String>,
    pub security_context: Value<String>,
    pub variables: Value<String>,
}

impl AccountModel {
    fn provider(&self) -> Result<CloudProvider> {
        key(&self.provider, "provider")?
            .parse()
            .map_err(|e: String| Error::invalid("provider", e))
    }

    fn from_remote(account: Account) -> Result<Self> {
        Ok(Self {
            id: Value::Known(account.id),
            key: Value::Known(account.key),
            name: Value::Known(account.name),
            short_name: nullable_string(account.short_name),
            description: nullable_string(account.description),
            provider: Value::Known(account.provider.to_string()),
            path: nullable_string(account.path),
            email: nullable_string(account.email),
            security_context: nullable_string(account.security_context),
            variables: json::from_api(account.variables.as_ref())?,
        })
    }

    fn input(&self) -> Result<AccountInput> {
        Ok(AccountInput {
            key: key(&self.key, "key")?.to_string(),
            provider: self.provider()?.to_string(),
            name: key(&self.name, "name")?.to_string(),
            short_name: opt(&self.short_name),
            description: opt(&self.description),
            email: opt(&self.email),
            security_context: opt(&self.security_context),
            variables: opt(&self.variables),
        })
    }
}

pub struct AccountResource {
    api: Api,
}

impl AccountResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

impl Resource for AccountResource {
    type Model = AccountModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new(TYPE_NAME)
            .attr(Attribute::computed("id").use_state())
            .attr(Attribute::required("key").replace())
            .attr(Attribute::required("name"))
            .attr(Attribute::optional("short_name"))
            .attr(Attribute::optional("description"))
            .attr(
                Attribute::required("provider")
                    .replace()
                    .normalize(normalize_provider)
                    .validate(ONE_OF_CLOUD_PROVIDERS),
            )
            .attr(Attribute::computed("path").use_state())
            .attr(Attribute::optional("email"))
            .attr(Attribute::optional("security_context").replace_if_null_string_change())
            .attr(Attribute::optional("variables").json())
    }

    fn import_keys(&self) -> ImportKeys {
        ImportKeys::new(&["provider", "key"])
    }

    fn read(&self, ctx: &Context, state: &AccountModel) -> Result<Option<AccountModel>> {
        let account = self
            .api
            .accounts()
            .read(&ctx.cancel, state.provider()?, key(&state.key, "key")?)?;
        AccountModel::from_remote(account).map(Some)
    }

    fn create(&self, ctx: &Context, planned: &AccountModel, _config: &AccountModel) -> Result<AccountModel> {
        let account = self.api.accounts().create(&ctx.cancel, &planned.input()?)?;
        log::info!("created account {}", account.key);
        AccountModel::from_remote(account)
    }

    fn update(
        &self,
        ctx: &Context,
        _prior: &AccountModel,
        planned: &AccountModel,
        _config: &AccountModel,
    ) -> Result<AccountModel> {
        let account = self.api.accounts().update(&ctx.cancel, &planned.input()?)?;
        AccountModel::from_remote(account)
    }

    fn delete(&self, ctx: &Context, state: &AccountModel) -> Result<()> {
        self.api
            .accounts()
            .delete(&ctx.cancel, state.provider()?, key(&state.key, "key")?)?;
        Ok(())
    }

    fn import(&self, id: &str) -> Result<AccountModel> {
        let values = self.import_keys().values(id)?;
        let provider: CloudProvider = values[0]
            .parse()
            .map_err(|e: String| Error::invalid("provider", e))?;
        Ok(AccountModel {
            provider: Value::Known(provider.to_string()),
            key: Value::Known(values[1].clone()),
            ..AccountModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing;
    use declarative::{Action, DynResource};
    use serde_json::{Value as Json, json};

    fn remote(extra: Json) -> Json {
        let mut account = json!({
            "id": "acc-1",
            "key": "123456789012",
            "name": "Prod",
            "provider": "AWS",
            "path": "/aws/prod",
            "email": "ops@x.io",
            "securityContext": null,
            "variables": null
        });
        if let (Json::Object(base), Json::Object(extra)) = (&mut account, extra) {
            base.extend(extra);
        }
        account
    }

    #[test]
    fn test_create_account() {
        let (api, mock) = testing::api();
        mock.reply("addAccount", json!({"addAccount": {"account": remote(json!({})), "problems": []}}));
        let resource = AccountResource::new(api);
        let config = json!({"provider": "aws", "key": "123456789012", "name": "Prod", "email": "ops@x.io"});

        let change = resource.plan(Some(&config), None).unwrap();
        assert_eq!(change.action, Action::Create);
        let planned = change.planned.clone().unwrap();
        assert_eq!(planned["provider"], json!("AWS"));
        assert_eq!(planned["id"], json!({"$unknown": true}));

        let state = resource.apply(&Context::new(), &change, Some(&config), None).unwrap().unwrap();
        assert_eq!(mock.operations(), vec!["addAccount"]);
        assert_eq!(state["id"], json!("acc-1"));
        assert_eq!(state["path"], json!("/aws/prod"));
        assert_eq!(state["security_context"], Json::Null);

        let input = mock.requests()[0].variable("input").cloned().unwrap();
        assert_eq!(input["provider"], json!("AWS"));
        assert_eq!(input["securityContext"], Json::Null);
    }

    #[test]
    fn test_read_then_same_config_is_noop() {
        let (api, mock) = testing::api();
        mock.reply("account", json!({"account": remote(json!({"variables": "{ \"b\": 1, \"a\": 2 }"}))}));
        let resource = AccountResource::new(api);
        let prior = json!({"provider": "AWS", "key": "123456789012"});
        let state = resource.refresh(&Context::new(), &prior).unwrap().unwrap();
        assert_eq!(state["variables"], json!(r#"{"a":2,"b":1}"#));

        let config = json!({
            "provider": "Aws", "key": "123456789012", "name": "Prod", "email": "ops@x.io",
            "variables": "{\"a\": 2, \"b\": 1}"
        });
        let change = resource.plan(Some(&config), Some(&state)).unwrap();
        assert_eq!(change.action, Action::NoOp);
    }

    #[test]
    fn test_security_context_unset_replaces() {
        let (api, _) = testing::api();
        let resource = AccountResource::new(api);
        let prior = json!({
            "id": "acc-1", "key": "1", "name": "n", "provider": "AWS", "path": "/",
            "security_context": "arn:aws:iam::1:role/x"
        });
        let config = json!({"provider": "AWS", "key": "1", "name": "n"});
        let change = resource.plan(Some(&config), Some(&prior)).unwrap();
        assert_eq!(change.action, Action::Replace);
        assert_eq!(change.replace_paths, vec!["security_context"]);
    }

    #[test]
    fn test_rename_updates_in_place() {
        let (api, mock) = testing::api();
        mock.reply(
            "updateAccount",
            json!({"updateAccount": {"account": remote(json!({"name": "Production"}))}}),
        );
        let resource = AccountResource::new(api);
        let prior = AccountModel::from_remote(serde_json::from_value(remote(json!({}))).unwrap()).unwrap();
        let prior = serde_json::to_value(prior).unwrap();
        let config = json!({"provider": "AWS", "key": "123456789012", "name": "Production", "email": "ops@x.io"});
        let change = resource.plan(Some(&config), Some(&prior)).unwrap();
        assert_eq!(change.action, Action::Update);
        let state = resource.apply(&Context::new(), &change, Some(&config), Some(&prior)).unwrap().unwrap();
        assert_eq!(state["name"], json!("Production"));
        assert_eq!(state["id"], json!("acc-1"));
    }

    #[test]
    fn test_invalid_provider_fails_validation() {
        let (api, mock) = testing::api();
        let resource = AccountResource::new(api);
        let err = resource
            .plan(Some(&json!({"provider": "ibm", "key": "1", "name": "n"})), None)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_import() {
        let (api, _) = testing::api();
        let resource = AccountResource::new(api);
        let model = resource.import("gcp:my-project").unwrap();
        assert_eq!(model.provider, Value::known("GCP"));
        assert_eq!(model.key, Value::known("my-project"));

        let err = resource.import("my-project").unwrap_err();
        assert_eq!(err.to_string(), "Import ID must be in the format: provider:key");
    }
}
