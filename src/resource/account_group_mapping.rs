//! Account group mapping resource - membership of one account in a group

use super::key;
use crate::api::Api;
use crate::api::account_group::AccountGroupMapping;
use declarative::{Attribute, Context, ImportKeys, Resource, Result, Schema, Validator, Value};
use serde::{Deserialize, Serialize};

pub const TYPE_NAME: &str = "stacklet_account_group_mapping";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountGroupMappingModel {
    pub id: Value<String>,
    pub group_uuid: Value<String>,
    pub account_key: Value<String>,
}

impl From<AccountGroupMapping> for AccountGroupMappingModel {
    fn from(mapping: AccountGroupMapping) -> Self {
        Self {
            id: Value::Known(mapping.id),
            group_uuid: Value::Known(mapping.group_uuid),
            account_key: Value::Known(mapping.account_key),
        }
    }
}

pub struct AccountGroupMappingResource {
    api: Api,
}

impl AccountGroupMappingResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

impl Resource for AccountGroupMappingResource {
    type Model = AccountGroupMappingModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new(TYPE_NAME)
            .attr(Attribute::computed("id").use_state())
            .attr(Attribute::required("group_uuid").replace().validate(Validator::Uuid))
            .attr(Attribute::required("account_key").replace())
    }

    fn import_keys(&self) -> ImportKeys {
        ImportKeys::new(&["group_uuid", "account_key"])
    }

    fn read(&self, ctx: &Context, state: &AccountGroupMappingModel) -> Result<Option<AccountGroupMappingModel>> {
        let mapping = self.api.account_groups().read_mapping(
            &ctx.cancel,
            key(&state.group_uuid, "group_uuid")?,
            key(&state.account_key, "account_key")?,
        )?;
        Ok(Some(mapping.into()))
    }

    fn create(
        &self,
        ctx: &Context,
        planned: &AccountGroupMappingModel,
        _config: &AccountGroupMappingModel,
    ) -> Result<AccountGroupMappingModel> {
        let mapping = self.api.account_groups().create_mapping(
            &ctx.cancel,
            key(&planned.group_uuid, "group_uuid")?,
            key(&planned.account_key, "account_key")?,
        )?;
        Ok(mapping.into())
    }

    /// Nothing to change remotely; every configurable attribute forces replacement
    fn update(
        &self,
        _ctx: &Context,
        prior: &AccountGroupMappingModel,
        planned: &AccountGroupMappingModel,
        _config: &AccountGroupMappingModel,
    ) -> Result<AccountGroupMappingModel> {
        Ok(AccountGroupMappingModel {
            id: prior.id.clone(),
            ..planned.clone()
        })
    }

    fn delete(&self, ctx: &Context, state: &AccountGroupMappingModel) -> Result<()> {
        self.api.account_groups().delete_mapping(&ctx.cancel, key(&state.id, "id")?)?;
        Ok(())
    }

    fn import(&self, id: &str) -> Result<AccountGroupMappingModel> {
        let values = self.import_keys().values(id)?;
        Ok(AccountGroupMappingModel {
            group_uuid: Value::Known(values[0].clone()),
            account_key: Value::Known(values[1].clone()),
            ..AccountGroupMappingModel::default()
        })
    }
}
