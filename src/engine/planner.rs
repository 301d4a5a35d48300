//! Builds the set of pending changes from manifest and state

use crate::manifest::Manifest;
use crate::provider::Provider;
use crate::state::{ResourceState, State};
use declarative::{Context, DiffSummary, Error, Operation, PendingChange};
use std::collections::HashSet;

/// An address that could not be refreshed or planned
#[derive(Debug)]
pub struct Failure {
    pub address: String,
    pub operation: Operation,
    pub error: Error,
}

impl Failure {
    fn new(address: impl Into<String>, operation: Operation, error: Error) -> Self {
        Self {
            address: address.into(),
            operation,
            error,
        }
    }
}

/// Outcome of reading every resource in state
#[derive(Debug, Default)]
pub struct Refresh {
    /// Gone from the remote, dropped from state
    pub removed: Vec<String>,
    pub failures: Vec<Failure>,
}

#[derive(Default)]
pub struct Plan {
    pub pending: Vec<PendingChange>,
    pub failures: Vec<Failure>,
}

impl Plan {
    pub fn summary(&self) -> DiffSummary {
        DiffSummary::from_changes(self.pending.iter().map(|p| &p.change))
    }

    pub fn changes(&self) -> impl Iterator<Item = &PendingChange> {
        self.pending.iter().filter(|p| p.change.has_changes())
    }

    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Read every resource in state, updating state in place
///
/// A resource the remote no longer has is removed; other errors are
/// collected and leave the stored record untouched.
pub fn refresh(ctx: &Context, provider: &Provider, state: &mut State) -> Refresh {
    let mut outcome = Refresh::default();
    let records: Vec<ResourceState> = state.resources.clone();

    for record in records {
        let address = record.address();
        if ctx.cancel.is_cancelled() {
            outcome.failures.push(Failure::new(address, Operation::Read, Error::Cancelled));
            continue;
        }
        let resource = match provider.resource(&record.kind) {
            Ok(r) => r,
            Err(e) => {
                outcome.failures.push(Failure::new(address, Operation::Read, e));
                continue;
            }
        };

        match resource.refresh(ctx, &record.attributes) {
            Ok(Some(attributes)) => state.set(&record.kind, &record.name, attributes),
            Ok(None) => {
                log::warn!("{address} no longer exists, removing it from state");
                state.remove(&address);
                outcome.removed.push(address);
            }
            Err(e) => outcome.failures.push(Failure::new(address, Operation::Read, e)),
        }
    }
    outcome
}

/// Plan every manifest resource, then a delete for whatever only state has
pub fn plan(provider: &Provider, manifest: &Manifest, state: &State) -> Plan {
    let mut plan = Plan::default();
    let declared: HashSet<String> = manifest.resources.iter().map(|r| r.address()).collect();

    for entry in &manifest.resources {
        let address = entry.address();
        let prior = state.get(&address).map(|r| r.attributes.clone());
        let config = entry.config();
        let planned = provider
            .resource(&entry.kind)
            .and_then(|resource| Ok((resource.plan(Some(&config), prior.as_ref())?, resource)));
        match planned {
            Ok((change, resource)) => plan.pending.push(PendingChange {
                address,
                resource,
                change,
                config: Some(config),
                prior,
            }),
            Err(e) => plan.failures.push(Failure::new(address, Operation::Plan, e)),
        }
    }

    for record in state.resources.iter().filter(|r| !declared.contains(&r.address())) {
        plan_delete(provider, record, &mut plan);
    }
    plan
}

/// Plan a delete for every resource in state, newest first
pub fn destroy(provider: &Provider, state: &State) -> Plan {
    let mut plan = Plan::default();
    for record in state.resources.iter().rev() {
        plan_delete(provider, record, &mut plan);
    }
    plan
}

fn plan_delete(provider: &Provider, record: &ResourceState, plan: &mut Plan) {
    let address = record.address();
    let planned = provider
        .resource(&record.kind)
        .and_then(|resource| Ok((resource.plan(None, Some(&record.attributes))?, resource)));
    match planned {
        Ok((change, resource)) => plan.pending.push(PendingChange {
            address,
            resource,
            change,
            config: None,
            prior: Some(record.attributes.clone()),
        }),
        Err(e) => plan.failures.push(Failure::new(address, Operation::Delete, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing;
    use declarative::Action;
    use serde_json::json;

    fn provider() -> (Provider, graphql::MockTransport) {
        let (api, mock) = testing::api();
        (Provider::new(api), mock)
    }

    #[test]
    fn test_plan_create_and_orphan_delete() {
        let (provider, _) = provider();
        let manifest = Manifest::parse(
            r#"
[[resource]]
type = "stacklet_sso_group"
name = "admins"
attributes = { name = "platform-admins", roles = ["viewer"] }
"#,
        )
        .unwrap();
        let mut state = State::default();
        state.set("stacklet_api_key", "old", json!({"id": "k-1", "identity": "ci", "secret": "s"}));

        let plan = plan(&provider, &manifest, &state);
        assert!(plan.is_ok());
        let actions: Vec<_> = plan.pending.iter().map(|p| (p.address.as_str(), p.change.action)).collect();
        assert_eq!(
            actions,
            vec![
                ("stacklet_sso_group.admins", Action::Create),
                ("stacklet_api_key.old", Action::Delete)
            ]
        );
        assert_eq!(plan.summary().additions, 1);
        assert_eq!(plan.summary().removals, 1);
    }

    #[test]
    fn test_plan_collects_failures() {
        let (provider, _) = provider();
        let manifest = Manifest::parse(
            r#"
[[resource]]
type = "stacklet_widget"
name = "w"

[[resource]]
type = "stacklet_sso_group"
name = "admins"
attributes = { name = "platform-admins", roles = ["viewer"], account_group_uuids = ["not-a-uuid"] }
"#,
        )
        .unwrap();
        let plan = plan(&provider, &manifest, &State::default());
        assert_eq!(plan.failures.len(), 2);
        assert!(plan.pending.is_empty());
        assert!(matches!(plan.failures[1].error, Error::Validation(_)));
    }

    #[test]
    fn test_refresh_drops_missing() {
        let (provider, mock) = provider();
        mock.reply("apiKey", json!({"apiKey": null}));
        let mut state = State::default();
        state.set("stacklet_api_key", "ci", json!({"id": "k-1", "identity": "ci", "secret": "s"}));

        let outcome = refresh(&Context::new(), &provider, &mut state);
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.removed, vec!["stacklet_api_key.ci"]);
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_refresh_keeps_record_on_error() {
        let (provider, mock) = provider();
        mock.fail(
            "apiKey",
            graphql::Error::Http {
                message: "connection reset".into(),
                status: None,
            },
        );
        let mut state = State::default();
        state.set("stacklet_api_key", "ci", json!({"id": "k-1", "identity": "ci", "secret": "s"}));

        let outcome = refresh(&Context::new(), &provider, &mut state);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].operation, Operation::Read);
        assert_eq!(state.resources.len(), 1);
    }

    #[test]
    fn test_destroy_newest_first() {
        let (provider, _) = provider();
        let mut state = State::default();
        state.set("stacklet_sso_group", "a", json!({"id": "1", "name": "a", "roles": ["viewer"]}));
        state.set("stacklet_sso_group", "b", json!({"id": "2", "name": "b", "roles": ["viewer"]}));
        let plan = destroy(&provider, &state);
        let order: Vec<_> = plan.pending.iter().map(|p| p.address.as_str()).collect();
        assert_eq!(order, vec!["stacklet_sso_group.b", "stacklet_sso_group.a"]);
        assert!(plan.pending.iter().all(|p| p.change.action == Action::Delete));
    }
}
