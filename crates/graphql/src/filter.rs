//! Filter envelopes for list queries.

use serde::Serialize;

/// `{ single: { name, operator: "equals", value } }`
///
/// Only equality is supported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    single: Single,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Single {
    name: String,
    operator: &'static str,
    value: String,
}

impl Filter {
    pub fn equals(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            single: Single {
                name: name.into(),
                operator: "equals",
                value: value.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equals_shape() {
        let filter = Filter::equals("name", "weekly");
        assert_eq!(
            serde_json::to_value(filter).unwrap(),
            json!({"single": {"name": "name", "operator": "equals", "value": "weekly"}})
        );
    }
}
