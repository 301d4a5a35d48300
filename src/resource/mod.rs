//! Managed resource kinds
//!
//! One module per kind. Each declares its model and attribute schema, maps
//! remote records into the model, and implements the lifecycle against the
//! API facade.

pub mod account;
pub mod account_discovery;
pub mod account_group;
pub mod account_group_mapping;
pub mod api_key;
pub mod binding;
pub mod policy_collection;
pub mod policy_collection_mapping;
pub mod profile;
pub mod report_group;
pub mod repository;
pub mod role_assignment;
pub mod sso_group;

use crate::api::Api;
use declarative::{BoxedResource, Error, Outgoing, Result, SecretField, SecretInput, SecretState, Value};
use std::sync::Arc;

/// Every resource kind, bound to one API handle
pub fn all(api: &Api) -> Vec<BoxedResource> {
    let mut kinds: Vec<BoxedResource> = vec![
        Arc::new(account::AccountResource::new(api.clone())),
        Arc::new(account_group::AccountGroupResource::new(api.clone())),
        Arc::new(account_group_mapping::AccountGroupMappingResource::new(api.clone())),
        Arc::new(account_discovery::AwsDiscoveryResource::new(api.clone())),
        Arc::new(account_discovery::AzureDiscoveryResource::new(api.clone())),
        Arc::new(account_discovery::GcpDiscoveryResource::new(api.clone())),
        Arc::new(policy_collection::PolicyCollectionResource::new(api.clone())),
        Arc::new(policy_collection_mapping::PolicyCollectionMappingResource::new(api.clone())),
        Arc::new(binding::BindingResource::new(api.clone())),
        Arc::new(report_group::ReportGroupResource::new(api.clone())),
        Arc::new(repository::RepositoryResource::new(api.clone())),
        Arc::new(api_key::ApiKeyResource::new(api.clone())),
        Arc::new(role_assignment::RoleAssignmentResource::new(api.clone())),
        Arc::new(sso_group::SsoGroupResource::new(api.clone())),
    ];
    kinds.extend(profile::all(api));
    kinds
}

/// A lookup key that must be known by the time a lifecycle call runs
pub(crate) fn key<'a>(value: &'a Value<String>, name: &str) -> Result<&'a str> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidState(format!("\"{name}\" is not set")))
}

/// Known value or `None`
pub(crate) fn opt<T: Clone>(value: &Value<T>) -> Option<T> {
    value.as_known().cloned()
}

/// Known list, or empty
pub(crate) fn list<T: Clone>(value: &Value<Vec<T>>) -> Vec<T> {
    value.as_known().cloned().unwrap_or_default()
}

/// One write-only triple as seen by a lifecycle call
pub(crate) struct Secret<'a> {
    pub field: SecretField,
    /// Plaintext from config
    pub plaintext: &'a Value<String>,
    /// Version from the plan
    pub version: &'a Value<String>,
}

impl Secret<'_> {
    /// What goes on the wire: plaintext on create, on a version bump, or when
    /// a paired field changed; the stored ciphertext otherwise
    ///
    /// `prior` is the stored `(ciphertext, version)`, `None` on create.
    pub fn outgoing(&self, prior: Option<(&Value<String>, &Value<String>)>, paired_changed: bool) -> Option<String> {
        let state = prior.map(|(ciphertext, version)| SecretState { ciphertext, version });
        let input = SecretInput {
            plaintext: self.plaintext,
            version: self.version,
        };
        let outgoing = self.field.value_to_send(state, input, paired_changed);
        if matches!(outgoing, Outgoing::Plaintext(_)) {
            log::debug!("sending new value for {}", self.field.name);
        }
        outgoing.into_option()
    }
}

/// Ciphertext to keep after a read: the stored one when known, otherwise
/// whatever the remote reports
pub(crate) fn read_ciphertext(prior: &Value<String>, returned: Option<String>) -> Value<String> {
    if prior.is_known() {
        prior.clone()
    } else {
        declarative::value::nullable_non_empty(returned)
    }
}
