//! Resource traits
//!
//! A resource kind implements [`Resource`] over its own typed model. The
//! blanket [`DynResource`] impl erases the model to JSON so the host can
//! hold every kind in one registry and drive plan, apply, refresh and import
//! uniformly.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::import::ImportKeys;
use crate::planner::{self, PlannedChange};
use crate::schema::Schema;
use crate::types::{Action, Diagnostic};
use crate::value::contains_unknown;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use std::fmt;
use std::sync::Arc;

/// One managed resource kind
///
/// Lifecycle methods receive the typed model. Fields that are write-only in
/// config are read from `config`; everything persisted comes from `planned`
/// or `state`.
pub trait Resource: Send + Sync {
    /// Persisted record plus write-only config inputs
    type Model: Clone
        + fmt::Debug
        + PartialEq
        + Serialize
        + DeserializeOwned
        + Default
        + Send
        + Sync;

    /// Type name, e.g. `stacklet_account`
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Components of the import ID
    fn import_keys(&self) -> ImportKeys;

    /// Checks that span several attributes
    fn validate(&self, _config: &Self::Model) -> Vec<Diagnostic> {
        Vec::new()
    }

    /// Adjust nested blocks after the generic proposal
    ///
    /// `prior` is `None` when the resource will be created.
    fn modify_plan(
        &self,
        _planned: &mut Self::Model,
        _prior: Option<&Self::Model>,
        _config: &Self::Model,
    ) -> Result<()> {
        Ok(())
    }

    /// Fetch the remote record; `None` means it is gone
    fn read(&self, ctx: &Context, state: &Self::Model) -> Result<Option<Self::Model>>;

    fn create(&self, ctx: &Context, planned: &Self::Model, config: &Self::Model) -> Result<Self::Model>;

    fn update(
        &self,
        ctx: &Context,
        prior: &Self::Model,
        planned: &Self::Model,
        config: &Self::Model,
    ) -> Result<Self::Model>;

    fn delete(&self, ctx: &Context, state: &Self::Model) -> Result<()>;

    /// Seed a model with the lookup keys parsed from an import ID
    fn import(&self, id: &str) -> Result<Self::Model>;
}

/// Type-erased view of a [`Resource`] over JSON records
pub trait DynResource: Send + Sync {
    fn kind(&self) -> &'static str;

    fn attributes(&self) -> Schema;

    /// Expected import ID format
    fn import_format(&self) -> String;

    /// Plan one resource. `config` is `None` when it was removed from the manifest.
    fn plan(&self, config: Option<&Json>, prior: Option<&Json>) -> Result<PlannedChange>;

    /// Carry out a planned change, returning the new state (`None` once deleted)
    fn apply(
        &self,
        ctx: &Context,
        change: &PlannedChange,
        config: Option<&Json>,
        prior: Option<&Json>,
    ) -> Result<Option<Json>>;

    /// Re-read the remote record; `None` drops it from state
    fn refresh(&self, ctx: &Context, state: &Json) -> Result<Option<Json>>;

    /// Build state for an existing remote entity
    fn import_state(&self, ctx: &Context, id: &str) -> Result<Json>;
}

/// Shared handle to a registered resource kind
pub type BoxedResource = Arc<dyn DynResource>;

fn decode<M: DeserializeOwned>(kind: &str, value: &Json) -> Result<M> {
    serde_json::from_value(value.clone())
        .map_err(|e| Error::invalid(kind, format!("cannot decode {kind}: {e}")))
}

impl<R: Resource> DynResource for R {
    fn kind(&self) -> &'static str {
        self.type_name()
    }

    fn attributes(&self) -> Schema {
        self.schema()
    }

    fn import_format(&self) -> String {
        self.import_keys().format_hint()
    }

    fn plan(&self, config: Option<&Json>, prior: Option<&Json>) -> Result<PlannedChange> {
        let schema = self.schema();
        let Some(config) = config else {
            return Ok(match prior {
                Some(prior) => PlannedChange::delete(&schema, prior),
                None => PlannedChange {
                    action: Action::NoOp,
                    planned: None,
                    changes: Vec::new(),
                    replace_paths: Vec::new(),
                },
            });
        };

        let mut diagnostics = planner::validate(&schema, config);
        let typed_config: R::Model = decode(self.type_name(), config)?;
        diagnostics.extend(self.validate(&typed_config));
        for warning in diagnostics.iter().filter(|d| !d.is_error()) {
            log::warn!("{}: {warning}", self.type_name());
        }
        let errors: Vec<Diagnostic> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }

        let typed_prior: Option<R::Model> = prior.map(|p| decode(self.type_name(), p)).transpose()?;
        let proposed = propose_typed(self, &schema, config, prior, typed_prior.as_ref(), &typed_config)?;
        let mut change = planner::decide(&schema, proposed, config, prior);

        if change.action == Action::Replace {
            log::debug!(
                "{}: replacing because of {}",
                self.type_name(),
                change.replace_paths.join(", ")
            );
            let fresh = propose_typed(self, &schema, config, None, None, &typed_config)?;
            change.changes = crate::diff::changed_attributes(&schema, prior, &fresh);
            change.planned = Some(fresh);
        }

        Ok(change)
    }

    fn apply(
        &self,
        ctx: &Context,
        change: &PlannedChange,
        config: Option<&Json>,
        prior: Option<&Json>,
    ) -> Result<Option<Json>> {
        ctx.cancel.check()?;
        let kind = self.type_name();
        let prior_model: Option<R::Model> = prior.map(|p| decode(kind, p)).transpose()?;
        let config_model: R::Model = config.map(|c| decode(kind, c)).transpose()?.unwrap_or_default();
        let planned_model: Option<R::Model> = change
            .planned
            .as_ref()
            .map(|p| decode(kind, p))
            .transpose()?;

        let missing = |what: &str| Error::InvalidState(format!("{kind}: {} without {what}", change.action));

        let result = match change.action {
            Action::NoOp => return Ok(prior.cloned()),
            Action::Delete => {
                let state = prior_model.ok_or_else(|| missing("prior state"))?;
                self.delete(ctx, &state)?;
                return Ok(None);
            }
            Action::Create => {
                let planned = planned_model.ok_or_else(|| missing("a planned record"))?;
                self.create(ctx, &planned, &config_model)?
            }
            Action::Update => {
                let planned = planned_model.ok_or_else(|| missing("a planned record"))?;
                let state = prior_model.ok_or_else(|| missing("prior state"))?;
                self.update(ctx, &state, &planned, &config_model)?
            }
            Action::Replace => {
                let planned = planned_model.ok_or_else(|| missing("a planned record"))?;
                let state = prior_model.ok_or_else(|| missing("prior state"))?;
                self.delete(ctx, &state)?;
                self.create(ctx, &planned, &config_model)?
            }
        };

        let state = serde_json::to_value(&result)?;
        if contains_unknown(&state) {
            return Err(Error::InvalidState(format!(
                "{kind}: apply left unknown values in state"
            )));
        }
        Ok(Some(state))
    }

    fn refresh(&self, ctx: &Context, state: &Json) -> Result<Option<Json>> {
        let model: R::Model = decode(self.type_name(), state)?;
        match self.read(ctx, &model) {
            Ok(Some(fresh)) => Ok(Some(serde_json::to_value(&fresh)?)),
            Ok(None) => Ok(None),
            Err(e) if e.is_not_found() => {
                log::warn!("{}: {e}; removing from state", self.type_name());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn import_state(&self, ctx: &Context, id: &str) -> Result<Json> {
        let seed = self.import(id)?;
        match self.read(ctx, &seed)? {
            Some(model) => Ok(serde_json::to_value(&model)?),
            None => Err(Error::not_found(format!("{} \"{id}\"", self.type_name()))),
        }
    }
}

/// Generic proposal followed by the kind's own adjustments
fn propose_typed<R: Resource + ?Sized>(
    resource: &R,
    schema: &Schema,
    config: &Json,
    prior: Option<&Json>,
    typed_prior: Option<&R::Model>,
    typed_config: &R::Model,
) -> Result<Json> {
    let proposed = planner::propose(schema, config, prior)?;
    let mut planned: R::Model = decode(resource.type_name(), &proposed)?;
    resource.modify_plan(&mut planned, typed_prior, typed_config)?;
    Ok(serde_json::to_value(&planned)?)
}
