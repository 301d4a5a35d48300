//! SSO group resource - maps an identity provider group onto roles
//! and account groups

use super::{key, list};
use crate::api::Api;
use crate::api::sso_group::{SsoGroup, SsoGroupInput};
use declarative::order::preserve_order;
use declarative::value::list_or_null;
use declarative::{Attribute, Context, ImportKeys, Resource, Result, Schema, Validator, Value};
use serde::{Deserialize, Serialize};

pub const TYPE_NAME: &str = "stacklet_sso_group";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsoGroupModel {
    pub id: Value<String>,
    pub name: Value<String>,
    pub roles: Value<Vec<String>>,
    pub account_group_uuids: Value<Vec<String>>,
}

impl SsoGroupModel {
    /// The remote returns both lists unordered; keep the order last written
    fn from_remote(group: SsoGroup, prior: Option<&Self>) -> Self {
        let (prior_roles, prior_groups) = prior
            .map(|p| (list(&p.roles), list(&p.account_group_uuids)))
            .unwrap_or_default();
        let roles = preserve_order(group.roles, &prior_roles, Clone::clone);
        let groups = preserve_order(group.account_group_uuids, &prior_groups, Clone::clone);
        Self {
            id: Value::Known(group.id),
            name: Value::Known(group.name),
            roles: list_or_null(roles, prior.map(|p| &p.roles)),
            account_group_uuids: list_or_null(groups, prior.map(|p| &p.account_group_uuids)),
        }
    }

    fn input(&self) -> Result<SsoGroupInput> {
        Ok(SsoGroupInput {
            name: key(&self.name, "name")?.to_string(),
            roles: list(&self.roles),
            account_group_uuids: list(&self.account_group_uuids),
        })
    }
}

pub struct SsoGroupResource {
    api: Api,
}

impl SsoGroupResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

impl Resource for SsoGroupResource {
    type Model = SsoGroupModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new(TYPE_NAME)
            .attr(Attribute::computed("id").use_state())
            .attr(Attribute::required("name").replace().validate(Validator::NotBlank))
            .attr(Attribute::required("roles").validate(Validator::NotBlank))
            .attr(Attribute::optional("account_group_uuids").validate(Validator::Uuid))
    }

    fn import_keys(&self) -> ImportKeys {
        ImportKeys::new(&["name"])
    }

    fn read(&self, ctx: &Context, state: &SsoGroupModel) -> Result<Option<SsoGroupModel>> {
        let group = self.api.sso_groups().read(&ctx.cancel, key(&state.name, "name")?)?;
        Ok(Some(SsoGroupModel::from_remote(group, Some(state))))
    }

    fn create(&self, ctx: &Context, planned: &SsoGroupModel, _config: &SsoGroupModel) -> Result<SsoGroupModel> {
        let group = self.api.sso_groups().create(&ctx.cancel, &planned.input()?)?;
        log::info!("created SSO group {}", group.name);
        Ok(SsoGroupModel::from_remote(group, Some(planned)))
    }

    fn update(
        &self,
        ctx: &Context,
        _prior: &SsoGroupModel,
        planned: &SsoGroupModel,
        _config: &SsoGroupModel,
    ) -> Result<SsoGroupModel> {
        let group = self.api.sso_groups().update(&ctx.cancel, &planned.input()?)?;
        Ok(SsoGroupModel::from_remote(group, Some(planned)))
    }

    fn delete(&self, ctx: &Context, state: &SsoGroupModel) -> Result<()> {
        self.api.sso_groups().delete(&ctx.cancel, key(&state.name, "name")?)?;
        Ok(())
    }

    fn import(&self, id: &str) -> Result<SsoGroupModel> {
        Ok(SsoGroupModel {
            name: Value::Known(self.import_keys().values(id)?.remove(0)),
            ..SsoGroupModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{self, GROUP_UUID};
    use declarative::{Action, DynResource};
    use serde_json::json;

    const OTHER_GROUP: &str = "55555555-5555-5555-5555-555555555555";

    #[test]
    fn test_remote_order_does_not_drift() {
        let (api, mock) = testing::api();
        mock.reply(
            "addSSOGroup",
            json!({"addSSOGroup": {"group": {
                "id": "g-1", "name": "platform-admins",
                "roles": ["viewer", "editor"], "accountGroupUUIDs": [OTHER_GROUP, GROUP_UUID]
            }, "problems": []}}),
        );
        let resource = SsoGroupResource::new(api);
        let config = json!({
            "name": "platform-admins",
            "roles": ["editor", "viewer"],
            "account_group_uuids": [GROUP_UUID, OTHER_GROUP]
        });
        let change = resource.plan(Some(&config), None).unwrap();
        let state = resource.apply(&Context::new(), &change, Some(&config), None).unwrap().unwrap();
        assert_eq!(state["roles"], json!(["editor", "viewer"]));
        assert_eq!(state["account_group_uuids"], json!([GROUP_UUID, OTHER_GROUP]));
        assert_eq!(resource.plan(Some(&config), Some(&state)).unwrap().action, Action::NoOp);
    }

    #[test]
    fn test_rename_replaces() {
        let (api, _) = testing::api();
        let resource = SsoGroupResource::new(api);
        let prior = json!({"id": "g-1", "name": "admins", "roles": ["viewer"], "account_group_uuids": null});
        let config = json!({"name": "operators", "roles": ["viewer"]});
        let change = resource.plan(Some(&config), Some(&prior)).unwrap();
        assert_eq!(change.action, Action::Replace);
        assert_eq!(change.replace_paths, vec!["name"]);
    }

    #[test]
    fn test_import_and_delete_by_name() {
        let (api, mock) = testing::api();
        mock.reply(
            "ssoGroup",
            json!({"ssoGroup": {"id": "g-1", "name": "admins", "roles": ["viewer"], "accountGroupUUIDs": []}}),
        );
        mock.reply("removeSSOGroup", json!({"removeSSOGroup": {"group": {"id": "g-1"}, "problems": []}}));
        let resource = SsoGroupResource::new(api);
        let state = resource.import_state(&Context::new(), "admins").unwrap();
        assert_eq!(state["id"], json!("g-1"));
        assert_eq!(state["account_group_uuids"], json!(null));

        let change = resource.plan(None, Some(&state)).unwrap();
        resource.apply(&Context::new(), &change, None, Some(&state)).unwrap();
        let removed = mock.requests_for("removeSSOGroup");
        assert_eq!(removed[0].variable("name"), Some(&json!("admins")));
    }

    #[test]
    fn test_bad_group_uuid_rejected() {
        let (api, _) = testing::api();
        let resource = SsoGroupResource::new(api);
        let config = json!({"name": "admins", "roles": ["viewer"], "account_group_uuids": ["nope"]});
        assert!(resource.plan(Some(&config), None).is_err());
    }
}
