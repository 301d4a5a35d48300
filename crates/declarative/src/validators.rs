//! Attribute validators
//!
//! Context-free checks that run before a plan reaches the API. Unknown and
//! null values are never rejected here; required-ness is the schema's job.

use crate::types::Diagnostic;
use crate::value::is_unknown_marker;
use serde_json::Value as Json;
use std::collections::HashSet;

/// A validator attached to an attribute
#[derive(Debug, Clone, Copy)]
pub enum Validator {
    /// `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`, hex digits
    Uuid,
    /// Membership in a closed set
    OneOf {
        values: &'static [&'static str],
        case_insensitive: bool,
    },
    /// No two list elements share the same string value for the named attribute
    UniqueStringAttribute(&'static str),
    /// String must parse as JSON
    Json,
    /// String must not be empty or whitespace only
    NotBlank,
}

impl Validator {
    /// Check a value; lists of scalars are checked element by element
    pub fn check(&self, path: &str, value: &Json) -> Vec<Diagnostic> {
        if value.is_null() || is_unknown_marker(value) {
            return Vec::new();
        }
        match self {
            Self::UniqueStringAttribute(name) => unique_string_attribute(value, name)
                .err()
                .map(|detail| Diagnostic::error("Duplicate nested block", detail).at(path))
                .into_iter()
                .collect(),
            scalar => match value {
                Json::Array(items) => items
                    .iter()
                    .enumerate()
                    .flat_map(|(i, item)| scalar.check(&format!("{path}[{i}]"), item))
                    .collect(),
                _ => scalar.check_scalar(path, value).into_iter().collect(),
            },
        }
    }

    fn check_scalar(&self, path: &str, value: &Json) -> Option<Diagnostic> {
        let Json::String(s) = value else {
            return None;
        };
        let detail = match self {
            Self::Uuid if !is_uuid(s) => format!("\"{s}\" is not a valid UUID"),
            Self::OneOf {
                values,
                case_insensitive,
            } if !one_of(s, values, *case_insensitive) => {
                format!("\"{s}\" must be one of: {}", values.join(", "))
            }
            Self::Json => match serde_json::from_str::<Json>(s) {
                Ok(_) => return None,
                Err(e) => format!("value is not valid JSON: {e}"),
            },
            Self::NotBlank if s.trim().is_empty() => "value must not be empty".to_string(),
            _ => return None,
        };
        Some(Diagnostic::error("Invalid attribute value", detail).at(path))
    }
}

/// Whether a string has UUID shape
pub fn is_uuid(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 36
        && bytes.iter().enumerate().all(|(i, b)| match i {
            8 | 13 | 18 | 23 => *b == b'-',
            _ => b.is_ascii_hexdigit(),
        })
}

/// Membership check, optionally ignoring case
pub fn one_of(s: &str, values: &[&str], case_insensitive: bool) -> bool {
    if case_insensitive {
        values.iter().any(|v| v.eq_ignore_ascii_case(s))
    } else {
        values.contains(&s)
    }
}

/// Elements of a list of objects must not share a value for `name`
pub fn unique_string_attribute(list: &Json, name: &str) -> Result<(), String> {
    let Json::Array(items) = list else {
        return Ok(());
    };
    let mut seen = HashSet::new();
    for item in items {
        if let Some(Json::String(value)) = item.get(name)
            && !seen.insert(value.as_str())
        {
            return Err(format!("duplicate {name} \"{value}\""));
        }
    }
    Ok(())
}
