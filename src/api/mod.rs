//! Control plane API facade
//!
//! One sub-facade per entity kind. Facades take and return plain records
//! whose field names follow the remote schema; polymorphic fields arrive
//! already discriminated on `__typename`.

pub mod account;
pub mod account_discovery;
pub mod account_group;
pub mod api_key;
pub mod binding;
pub mod platform;
pub mod policy_collection;
pub mod profile;
pub mod report_group;
pub mod repository;
pub mod role_assignment;
pub mod sso_group;

use graphql::{Client, Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use std::fmt;

/// Entry point to every facade; cheap to clone
#[derive(Debug, Clone)]
pub struct Api {
    client: Client,
}

impl Api {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn accounts(&self) -> account::Accounts<'_> {
        account::Accounts::new(&self.client)
    }

    pub fn account_groups(&self) -> account_group::AccountGroups<'_> {
        account_group::AccountGroups::new(&self.client)
    }

    pub fn account_discoveries(&self) -> account_discovery::AccountDiscoveries<'_> {
        account_discovery::AccountDiscoveries::new(&self.client)
    }

    pub fn policy_collections(&self) -> policy_collection::PolicyCollections<'_> {
        policy_collection::PolicyCollections::new(&self.client)
    }

    pub fn bindings(&self) -> binding::Bindings<'_> {
        binding::Bindings::new(&self.client)
    }

    pub fn report_groups(&self) -> report_group::ReportGroups<'_> {
        report_group::ReportGroups::new(&self.client)
    }

    pub fn profiles(&self) -> profile::Profiles<'_> {
        profile::Profiles::new(&self.client)
    }

    pub fn repositories(&self) -> repository::Repositories<'_> {
        repository::Repositories::new(&self.client)
    }

    pub fn api_keys(&self) -> api_key::ApiKeys<'_> {
        api_key::ApiKeys::new(&self.client)
    }

    pub fn role_assignments(&self) -> role_assignment::RoleAssignments<'_> {
        role_assignment::RoleAssignments::new(&self.client)
    }

    pub fn sso_groups(&self) -> sso_group::SsoGroups<'_> {
        sso_group::SsoGroups::new(&self.client)
    }

    pub fn platform(&self) -> platform::PlatformApi<'_> {
        platform::PlatformApi::new(&self.client)
    }
}

/// Decode the entity under `field`
///
/// A null entity, or one whose `id` is null or empty, is reported as not
/// found under `what`.
pub(crate) fn entity<T: DeserializeOwned>(mut data: Json, field: &str, what: impl fmt::Display) -> Result<T> {
    let value = data.get_mut(field).map(Json::take).unwrap_or(Json::Null);
    if is_missing(&value) {
        return Err(Error::NotFound(what.to_string()));
    }
    serde_json::from_value(value).map_err(|e| Error::Decode(format!("{field}: {e}")))
}

fn is_missing(value: &Json) -> bool {
    match value {
        Json::Null => true,
        Json::Object(map) => match map.get("id") {
            Some(Json::Null) => true,
            Some(Json::String(id)) => id.is_empty(),
            _ => false,
        },
        _ => false,
    }
}

/// Problems selection shared by every mutation payload
macro_rules! problems {
    () => {
        "problems { __typename message }"
    };
}
pub(crate) use problems;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Thing {
        id: String,
    }

    #[test]
    fn test_entity_null_is_not_found() {
        let err = entity::<Thing>(json!({"thing": null}), "thing", "thing \"x\"").unwrap_err();
        assert_eq!(err, Error::NotFound("thing \"x\"".into()));
    }

    #[test]
    fn test_entity_empty_id_is_not_found() {
        let err = entity::<Thing>(json!({"thing": {"id": ""}}), "thing", "thing").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_entity_decodes() {
        let thing: Thing = entity(json!({"thing": {"id": "t1"}}), "thing", "thing").unwrap();
        assert_eq!(thing.id, "t1");
    }
}
