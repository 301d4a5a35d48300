//! Tri-state attribute values
//!
//! Every manifest attribute is either a known value, explicitly null, or
//! unknown-pending. Unknown only ever appears in planned records: it marks a
//! value the remote will decide during apply.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as Json;

/// Key of the marker object used to carry unknown-pending values through JSON.
pub const UNKNOWN_KEY: &str = "$unknown";

/// A manifest attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value<T> {
    /// Explicitly null or not configured
    Null,
    /// Pending: decided by the remote during apply
    Unknown,
    /// A concrete value
    Known(T),
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Self::Null
    }
}

impl<T> Value<T> {
    /// Wrap a concrete value
    pub fn known(value: impl Into<T>) -> Self {
        Self::Known(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Borrow the concrete value, if any
    pub fn as_known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Collapse null and unknown into `None`
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Absent becomes null
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Known)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Value<U> {
        match self {
            Self::Known(v) => Value::Known(f(v)),
            Self::Null => Value::Null,
            Self::Unknown => Value::Unknown,
        }
    }

    pub fn as_ref(&self) -> Value<&T> {
        match self {
            Self::Known(v) => Value::Known(v),
            Self::Null => Value::Null,
            Self::Unknown => Value::Unknown,
        }
    }

    /// Replace an unknown value with `fallback`, keep everything else
    pub fn resolve_unknown(self, fallback: Self) -> Self {
        match self {
            Self::Unknown => fallback,
            other => other,
        }
    }
}

impl Value<String> {
    /// Borrow the string, if known
    pub fn as_str(&self) -> Option<&str> {
        self.as_known().map(String::as_str)
    }
}

impl Value<bool> {
    /// Known `true`; null and unknown read as false
    pub fn is_true(&self) -> bool {
        matches!(self, Self::Known(true))
    }
}

impl<T> From<Option<T>> for Value<T> {
    fn from(value: Option<T>) -> Self {
        Self::from_option(value)
    }
}

impl<T: Serialize> Serialize for Value<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(v) => v.serialize(serializer),
            Self::Null => serializer.serialize_none(),
            Self::Unknown => unknown_marker().serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Value<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Json::deserialize(deserializer)?;
        if raw.is_null() {
            return Ok(Self::Null);
        }
        if is_unknown_marker(&raw) {
            return Ok(Self::Unknown);
        }
        serde_json::from_value(raw)
            .map(Self::Known)
            .map_err(serde::de::Error::custom)
    }
}

/// JSON form of an unknown-pending value
pub fn unknown_marker() -> Json {
    let mut map = serde_json::Map::new();
    map.insert(UNKNOWN_KEY.to_string(), Json::Bool(true));
    Json::Object(map)
}

/// Whether a JSON value is the unknown marker
pub fn is_unknown_marker(value: &Json) -> bool {
    match value {
        Json::Object(map) => map.len() == 1 && map.get(UNKNOWN_KEY) == Some(&Json::Bool(true)),
        _ => false,
    }
}

/// Whether a JSON tree contains an unknown marker anywhere
pub fn contains_unknown(value: &Json) -> bool {
    if is_unknown_marker(value) {
        return true;
    }
    match value {
        Json::Array(items) => items.iter().any(contains_unknown),
        Json::Object(map) => map.values().any(contains_unknown),
        _ => false,
    }
}

// ============================================================================
// Conversion helpers between API optionals and manifest values
// ============================================================================

pub fn nullable_string(value: Option<String>) -> Value<String> {
    Value::from_option(value)
}

pub fn nullable_bool(value: Option<bool>) -> Value<bool> {
    Value::from_option(value)
}

pub fn nullable_int(value: Option<i64>) -> Value<i64> {
    Value::from_option(value)
}

pub fn nullable_float(value: Option<f64>) -> Value<f64> {
    Value::from_option(value)
}

/// Empty strings from the API are treated as null
pub fn nullable_non_empty(value: Option<String>) -> Value<String> {
    Value::from_option(value.filter(|s| !s.is_empty()))
}

/// Null and unknown lists become empty
pub fn strings_list(value: &Value<Vec<String>>) -> Vec<String> {
    value.as_known().cloned().unwrap_or_default()
}

/// Known list, or null when the source list is empty and the prior value was null
///
/// Keeps `null` and `[]` from flapping when the API always returns a list.
pub fn list_or_null<T>(items: Vec<T>, prior: Option<&Value<Vec<T>>>) -> Value<Vec<T>> {
    let prior_was_null = prior.is_none_or(Value::is_null);
    if items.is_empty() && prior_was_null {
        Value::Null
    } else {
        Value::Known(items)
    }
}

/// Build a list of nested objects from a source slice
pub fn object_list<S, E>(source: &[S], factory: impl Fn(&S) -> E) -> Vec<E> {
    source.iter().map(factory).collect()
}

/// Build a keyed map of nested objects from a source slice
pub fn object_map_from_list<S, E>(
    source: &[S],
    key: impl Fn(&S) -> String,
    factory: impl Fn(&S) -> E,
) -> std::collections::BTreeMap<String, E> {
    source.iter().map(|s| (key(s), factory(s))).collect()
}
