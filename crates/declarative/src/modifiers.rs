//! Plan modifiers
//!
//! Pure functions over `(prior, planned, config)` attribute values. The plan
//! engine applies them per attribute after proposing the new record.

use serde_json::Value as Json;

/// Produces a default value
pub type DefaultFn = fn() -> Json;

/// Maps a configured value to its canonical form
pub type NormalizeFn = fn(&Json) -> Json;

/// A plan modifier attached to an attribute
#[derive(Debug, Clone, Copy)]
pub enum Modifier {
    /// Keep the prior value of a computed attribute instead of marking it unknown
    UseStateForUnknown,
    /// Replace the resource whenever the value changes
    RequiresReplace,
    /// Replace when a previously non-null value is now configured as null
    RequiresReplaceIfUnset,
    /// Replace on a null <-> non-null transition
    RequiresReplaceIfNullStringChange,
    /// Replace when any listed field inside the object changes, or the object goes away
    RequiresReplaceIfFieldsChanged(&'static [&'static str]),
    /// Supply a default when both config and plan are null
    DefaultObject(DefaultFn),
    /// Strip trailing whitespace from strings
    TrimWhitespace,
    /// Canonicalize the configured value
    Normalize(NormalizeFn),
}

/// Strip trailing whitespace from a string value
pub fn trim_whitespace(value: &Json) -> Json {
    match value {
        Json::String(s) => Json::String(s.trim_end().to_string()),
        other => other.clone(),
    }
}

/// Any change of a value already in state
pub fn requires_replace(prior: &Json, planned: &Json) -> bool {
    prior != planned
}

/// A value that was set is now configured as null
pub fn requires_replace_if_unset(prior: &Json, config: &Json) -> bool {
    !prior.is_null() && config.is_null()
}

/// Null <-> non-null transition; an unknown plan counts as non-null
pub fn requires_replace_if_null_string_change(prior: &Json, planned: &Json) -> bool {
    prior.is_null() != planned.is_null()
}

/// A listed field inside an existing object changed, or the object went away
pub fn requires_replace_if_fields_changed(prior: &Json, planned: &Json, fields: &[&str]) -> bool {
    let Json::Object(before) = prior else {
        return false;
    };
    let Json::Object(after) = planned else {
        return true;
    };
    fields
        .iter()
        .any(|f| before.get(*f).unwrap_or(&Json::Null) != after.get(*f).unwrap_or(&Json::Null))
}

/// Default value when neither config nor plan supplied one
pub fn default_object(config: &Json, planned: &Json, default: DefaultFn) -> Option<Json> {
    if config.is_null() && planned.is_null() {
        Some(default())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trim_whitespace() {
        assert_eq!(trim_whitespace(&json!("hello \n\t")), json!("hello"));
        assert_eq!(trim_whitespace(&json!("  lead")), json!("  lead"));
        assert_eq!(trim_whitespace(&json!(3)), json!(3));
    }

    #[test]
    fn test_requires_replace_if_unset() {
        assert!(requires_replace_if_unset(&json!("x"), &Json::Null));
        assert!(!requires_replace_if_unset(&Json::Null, &Json::Null));
        assert!(!requires_replace_if_unset(&json!("x"), &json!("y")));
    }

    #[test]
    fn test_requires_replace_if_null_string_change() {
        assert!(requires_replace_if_null_string_change(&Json::Null, &json!("f")));
        assert!(requires_replace_if_null_string_change(&json!("f"), &Json::Null));
        assert!(!requires_replace_if_null_string_change(&json!("f"), &json!("g")));
        assert!(!requires_replace_if_null_string_change(&Json::Null, &Json::Null));
    }

    #[test]
    fn test_requires_replace_if_fields_changed() {
        let prior = json!({"repository_uuid": "a", "branch": "main"});
        let same_repo = json!({"repository_uuid": "a", "branch": "dev"});
        let other_repo = json!({"repository_uuid": "b", "branch": "main"});
        let fields = &["repository_uuid"];
        assert!(!requires_replace_if_fields_changed(&prior, &same_repo, fields));
        assert!(requires_replace_if_fields_changed(&prior, &other_repo, fields));
        assert!(requires_replace_if_fields_changed(&prior, &Json::Null, fields));
        assert!(!requires_replace_if_fields_changed(&Json::Null, &other_repo, fields));
    }

    #[test]
    fn test_default_object() {
        fn default() -> Json {
            json!({"enabled": false})
        }
        assert_eq!(
            default_object(&Json::Null, &Json::Null, default),
            Some(json!({"enabled": false}))
        );
        assert_eq!(default_object(&json!({}), &Json::Null, default), None);
    }
}
