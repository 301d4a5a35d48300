//! Plan engine
//!
//! Planning is two steps around a per-kind hook:
//!
//! 1. [`propose`] builds the candidate record from config and prior state,
//!    attribute by attribute, following the schema.
//! 2. The resource kind adjusts nested blocks (ciphertexts per block, order).
//! 3. [`decide`] compares the candidate with prior state, marks computed
//!    attributes unknown when something changes, and picks the action.

use crate::diff::{AttributeChange, changed_attributes};
use crate::error::Result;
use crate::json;
use crate::modifiers::{self, Modifier};
use crate::schema::{Attribute, Mode, Schema};
use crate::secret::{self, SecretState};
use crate::types::{Action, Diagnostic};
use crate::value::{Value, is_unknown_marker, unknown_marker};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// The outcome of planning one resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedChange {
    pub action: Action,
    /// Planned record; `None` when deleting
    pub planned: Option<Json>,
    /// Attribute-level differences against prior state
    pub changes: Vec<AttributeChange>,
    /// Attributes whose change forces destroy-then-create
    pub replace_paths: Vec<String>,
}

impl PlannedChange {
    pub fn no_op(prior: Json) -> Self {
        Self {
            action: Action::NoOp,
            planned: Some(prior),
            changes: Vec::new(),
            replace_paths: Vec::new(),
        }
    }

    pub fn delete(schema: &Schema, prior: &Json) -> Self {
        Self {
            action: Action::Delete,
            planned: None,
            changes: changed_attributes(schema, Some(prior), &Json::Null),
            replace_paths: Vec::new(),
        }
    }

    pub fn has_changes(&self) -> bool {
        self.action.is_change()
    }
}

fn field<'a>(record: Option<&'a Json>, name: &str) -> &'a Json {
    record.and_then(|r| r.get(name)).unwrap_or(&Json::Null)
}

fn as_string_value(value: &Json) -> Value<String> {
    match value {
        Json::Null => Value::Null,
        v if is_unknown_marker(v) => Value::Unknown,
        Json::String(s) => Value::Known(s.clone()),
        other => Value::Known(other.to_string()),
    }
}

/// Check config against the schema before planning
pub fn validate(schema: &Schema, config: &Json) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let empty = Map::new();
    let object = config.as_object().unwrap_or(&empty);

    for key in object.keys() {
        if schema.get(key).is_none() {
            diagnostics.push(
                Diagnostic::error(
                    "Unsupported argument",
                    format!("{} does not accept \"{key}\"", schema.type_name),
                )
                .at(key.as_str()),
            );
        }
    }

    for attr in &schema.attributes {
        let value = object.get(attr.name).unwrap_or(&Json::Null);
        match attr.mode {
            Mode::Required if value.is_null() => diagnostics.push(
                Diagnostic::error(
                    "Missing required argument",
                    format!("the argument \"{}\" is required", attr.name),
                )
                .at(attr.name),
            ),
            Mode::Computed if !value.is_null() => diagnostics.push(
                Diagnostic::error(
                    "Value for unconfigurable attribute",
                    format!("\"{}\" is set by the API and cannot be configured", attr.name),
                )
                .at(attr.name),
            ),
            _ => {}
        }
        for validator in &attr.validators {
            diagnostics.extend(validator.check(attr.name, value));
        }
    }

    diagnostics
}

/// Canonicalize a configured value per the attribute's modifiers
fn configured_value(attr: &Attribute, raw: &Json) -> Result<Json> {
    let mut value = raw.clone();
    for m in &attr.modifiers {
        match m {
            Modifier::TrimWhitespace => value = modifiers::trim_whitespace(&value),
            Modifier::Normalize(f) if !value.is_null() && !is_unknown_marker(&value) => {
                value = f(&value);
            }
            _ => {}
        }
    }
    if attr.json
        && let Json::String(s) = &value
    {
        value = Json::String(json::normalize(s).map_err(|e| {
            crate::error::Error::invalid(attr.name, format!("value is not valid JSON: {e}"))
        })?);
    }
    Ok(value)
}

fn paired_changed(attr: &Attribute, config: &Json, prior: Option<&Json>) -> bool {
    attr.secret.is_some_and(|binding| {
        binding
            .paired
            .iter()
            .any(|f| field(Some(config), f) != field(prior, f))
    })
}

/// Build the candidate planned record
///
/// `prior` is `None` when the resource is being created.
pub fn propose(schema: &Schema, config: &Json, prior: Option<&Json>) -> Result<Json> {
    let mut planned = Map::new();

    for attr in schema.persisted() {
        let c = configured_value(attr, field(Some(config), attr.name))?;
        let p = field(prior, attr.name);

        let value = if let Some(binding) = attr.secret {
            let state_version = as_string_value(field(prior, binding.version));
            let state_ciphertext = as_string_value(p);
            let config_version = as_string_value(field(Some(config), binding.version));
            let state = prior.map(|_| SecretState {
                ciphertext: &state_ciphertext,
                version: &state_version,
            });
            let planned = secret::plan_ciphertext(
                state,
                &config_version,
                paired_changed(attr, config, prior),
            );
            serde_json::to_value(planned)?
        } else {
            match attr.mode {
                Mode::Required | Mode::Optional => c,
                Mode::Computed => match prior {
                    Some(_) => p.clone(),
                    None => unknown_marker(),
                },
                Mode::OptionalComputed if !c.is_null() => c,
                Mode::OptionalComputed => match prior {
                    Some(_) if attr.default_fn().is_none() => p.clone(),
                    _ => Json::Null,
                },
            }
        };

        let value = match attr.default_fn() {
            Some(default) => {
                modifiers::default_object(field(Some(config), attr.name), &value, default)
                    .unwrap_or(value)
            }
            None => value,
        };

        // Optional-computed with neither config nor default is up to the remote on create
        let value = if value.is_null() && attr.mode == Mode::OptionalComputed && prior.is_none() {
            unknown_marker()
        } else {
            value
        };

        planned.insert(attr.name.to_string(), value);
    }

    Ok(Json::Object(planned))
}

/// Compare the candidate with prior state and choose the action
pub fn decide(schema: &Schema, proposed: Json, config: &Json, prior: Option<&Json>) -> PlannedChange {
    let Some(prior) = prior else {
        return PlannedChange {
            action: Action::Create,
            changes: changed_attributes(schema, None, &proposed),
            planned: Some(proposed),
            replace_paths: Vec::new(),
        };
    };

    if changed_attributes(schema, Some(prior), &proposed).is_empty() {
        return PlannedChange::no_op(prior.clone());
    }

    let mut planned = proposed;
    if let Json::Object(map) = &mut planned {
        for attr in schema.persisted() {
            let keeps_state = attr.has(|m| matches!(m, Modifier::UseStateForUnknown))
                && !field(Some(prior), attr.name).is_null();
            let remote_decides = match attr.mode {
                Mode::Computed => attr.secret.is_none(),
                Mode::OptionalComputed => {
                    field(Some(config), attr.name).is_null() && attr.default_fn().is_none()
                }
                _ => false,
            };
            if remote_decides && !keeps_state {
                map.insert(attr.name.to_string(), unknown_marker());
            }
        }
    }

    let replace_paths = replace_reasons(schema, prior, &planned, config);
    let action = if replace_paths.is_empty() {
        Action::Update
    } else {
        Action::Replace
    };

    PlannedChange {
        action,
        changes: changed_attributes(schema, Some(prior), &planned),
        planned: Some(planned),
        replace_paths,
    }
}

/// Attributes whose modifiers demand replacement
pub fn replace_reasons(schema: &Schema, prior: &Json, planned: &Json, config: &Json) -> Vec<String> {
    let mut reasons = Vec::new();
    for attr in schema.persisted() {
        let p = field(Some(prior), attr.name);
        let o = field(Some(planned), attr.name);
        let c = field(Some(config), attr.name);
        let replace = attr.modifiers.iter().any(|m| match m {
            Modifier::RequiresReplace => modifiers::requires_replace(p, o),
            Modifier::RequiresReplaceIfUnset => modifiers::requires_replace_if_unset(p, c),
            Modifier::RequiresReplaceIfNullStringChange => {
                modifiers::requires_replace_if_null_string_change(p, o)
            }
            Modifier::RequiresReplaceIfFieldsChanged(fields) => {
                modifiers::requires_replace_if_fields_changed(p, o, fields)
            }
            _ => false,
        });
        if replace {
            reasons.push(attr.name.to_string());
        }
    }
    reasons
}
