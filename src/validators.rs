//! Domain validators
//!
//! The generic checks (UUID shape, enum membership, unique block names) live
//! in `declarative::validators`; these are the ones that know the control
//! plane's vocabulary.

use crate::enums::{CloudProvider, PrincipalType, ReportSource, TargetType};
use declarative::{Diagnostic, Validator, Value};
use serde::{Deserialize, Serialize};

/// Cloud provider membership, case-insensitive
pub const ONE_OF_CLOUD_PROVIDERS: Validator = Validator::OneOf {
    values: CloudProvider::VALUES,
    case_insensitive: true,
};

pub const ONE_OF_REPORT_SOURCES: Validator = Validator::OneOf {
    values: ReportSource::VALUES,
    case_insensitive: true,
};

pub const ONE_OF_PRINCIPAL_TYPES: Validator = Validator::OneOf {
    values: PrincipalType::VALUES,
    case_insensitive: true,
};

pub const ONE_OF_TARGET_TYPES: Validator = Validator::OneOf {
    values: TargetType::VALUES,
    case_insensitive: true,
};

pub const RECIPIENT_SUMMARY: &str = "Exactly one recipient field must be set";

/// A notification recipient
///
/// Exactly one of the five discriminators may be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recipient {
    pub account_owner: Value<bool>,
    pub event_owner: Value<bool>,
    pub resource_owner: Value<bool>,
    pub tag: Value<String>,
    pub value: Value<String>,
}

/// Check one recipient; `path` locates it for the diagnostic
pub fn exactly_one_recipient(recipient: &Recipient, path: &str) -> Option<Diagnostic> {
    let non_empty = |v: &Value<String>| v.as_str().is_some_and(|s| !s.is_empty());
    let set = [
        recipient.account_owner.is_true(),
        recipient.event_owner.is_true(),
        recipient.resource_owner.is_true(),
        non_empty(&recipient.tag),
        non_empty(&recipient.value),
    ]
    .iter()
    .filter(|b| **b)
    .count();

    // Unknown values can't be judged until apply
    let pending = recipient.tag.is_unknown()
        || recipient.value.is_unknown()
        || recipient.account_owner.is_unknown()
        || recipient.event_owner.is_unknown()
        || recipient.resource_owner.is_unknown();

    (set != 1 && !pending).then(|| {
        Diagnostic::error(
            RECIPIENT_SUMMARY,
            format!(
                "set one of account_owner, event_owner, resource_owner, tag or value ({set} set)"
            ),
        )
        .at(path)
    })
}

/// Check a list of recipients at `prefix.recipients[i]`
pub fn recipients(list: &[Recipient], prefix: &str) -> Vec<Diagnostic> {
    list.iter()
        .enumerate()
        .filter_map(|(i, r)| exactly_one_recipient(r, &format!("{prefix}.recipients[{i}]")))
        .collect()
}

/// Check a value against a validator, at `path`
pub fn check_str(validator: Validator, path: &str, value: &Value<String>) -> Vec<Diagnostic> {
    match value.as_str() {
        Some(s) => validator.check(path, &serde_json::Value::String(s.to_string())),
        None => Vec::new(),
    }
}
