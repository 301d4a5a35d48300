//! Policy collection mapping resource - one policy pinned into a collection
//!
//! Both create and update go through the upsert mutation. Leaving
//! `policy_version` unset tracks the latest version at write time.

use super::{key, opt};
use crate::api::Api;
use crate::api::policy_collection::{MappingInput, PolicyCollectionMapping};
use declarative::value::nullable_int;
use declarative::{Attribute, Context, ImportKeys, Resource, Result, Schema, Validator, Value};
use serde::{Deserialize, Serialize};

pub const TYPE_NAME: &str = "stacklet_policy_collection_mapping";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyCollectionMappingModel {
    pub id: Value<String>,
    pub collection_uuid: Value<String>,
    pub policy_uuid: Value<String>,
    pub policy_version: Value<i64>,
}

impl From<PolicyCollectionMapping> for PolicyCollectionMappingModel {
    fn from(mapping: PolicyCollectionMapping) -> Self {
        Self {
            id: Value::Known(mapping.id),
            collection_uuid: Value::Known(mapping.collection_uuid),
            policy_uuid: Value::Known(mapping.policy_uuid),
            policy_version: nullable_int(mapping.policy_version),
        }
    }
}

impl PolicyCollectionMappingModel {
    fn input(&self) -> Result<MappingInput> {
        Ok(MappingInput {
            collection_uuid: key(&self.collection_uuid, "collection_uuid")?.to_string(),
            policy_uuid: key(&self.policy_uuid, "policy_uuid")?.to_string(),
            policy_version: opt(&self.policy_version),
        })
    }
}

pub struct PolicyCollectionMappingResource {
    api: Api,
}

impl PolicyCollectionMappingResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn upsert(&self, ctx: &Context, planned: &PolicyCollectionMappingModel) -> Result<PolicyCollectionMappingModel> {
        let mapping = self.api.policy_collections().upsert_mapping(&ctx.cancel, &planned.input()?)?;
        Ok(mapping.into())
    }
}

impl Resource for PolicyCollectionMappingResource {
    type Model = PolicyCollectionMappingModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new(TYPE_NAME)
            .attr(Attribute::computed("id").use_state())
            .attr(Attribute::required("collection_uuid").replace().validate(Validator::Uuid))
            .attr(Attribute::required("policy_uuid").replace().validate(Validator::Uuid))
            .attr(Attribute::optional_computed("policy_version"))
    }

    fn import_keys(&self) -> ImportKeys {
        ImportKeys::new(&["collection_uuid", "policy_uuid"])
    }

    fn read(
        &self,
        ctx: &Context,
        state: &PolicyCollectionMappingModel,
    ) -> Result<Option<PolicyCollectionMappingModel>> {
        let mapping = self.api.policy_collections().read_mapping(
            &ctx.cancel,
            key(&state.collection_uuid, "collection_uuid")?,
            key(&state.policy_uuid, "policy_uuid")?,
        )?;
        Ok(Some(mapping.into()))
    }

    fn create(
        &self,
        ctx: &Context,
        planned: &PolicyCollectionMappingModel,
        _config: &PolicyCollectionMappingModel,
    ) -> Result<PolicyCollectionMappingModel> {
        self.upsert(ctx, planned)
    }

    fn update(
        &self,
        ctx: &Context,
        _prior: &PolicyCollectionMappingModel,
        planned: &PolicyCollectionMappingModel,
        _config: &PolicyCollectionMappingModel,
    ) -> Result<PolicyCollectionMappingModel> {
        self.upsert(ctx, planned)
    }

    fn delete(&self, ctx: &Context, state: &PolicyCollectionMappingModel) -> Result<()> {
        self.api.policy_collections().delete_mapping(&ctx.cancel, key(&state.id, "id")?)?;
        Ok(())
    }

    fn import(&self, id: &str) -> Result<PolicyCollectionMappingModel> {
        let mut values = self.import_keys().values(id)?.into_iter();
        Ok(PolicyCollectionMappingModel {
            collection_uuid: Value::from_option(values.next()),
            policy_uuid: Value::from_option(values.next()),
            ..PolicyCollectionMappingModel::default()
        })
    }
}
