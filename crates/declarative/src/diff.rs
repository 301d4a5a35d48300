//! Attribute-level differences between prior state and a planned record

use crate::planner::PlannedChange;
use crate::schema::Schema;
use crate::types::Action;
use crate::value::is_unknown_marker;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// One attribute that differs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub name: String,
    pub before: Json,
    pub after: Json,
    /// Redact both sides when rendering
    pub sensitive: bool,
}

impl AttributeChange {
    /// Value is decided by the remote during apply
    pub fn known_after_apply(&self) -> bool {
        is_unknown_marker(&self.after)
    }
}

/// Persisted attributes whose values differ
///
/// With no prior state every non-null planned attribute counts as a change.
pub fn changed_attributes(schema: &Schema, prior: Option<&Json>, planned: &Json) -> Vec<AttributeChange> {
    schema
        .persisted()
        .filter_map(|attr| {
            let before = prior
                .and_then(|p| p.get(attr.name))
                .cloned()
                .unwrap_or(Json::Null);
            let after = planned.get(attr.name).cloned().unwrap_or(Json::Null);
            (before != after).then(|| AttributeChange {
                name: attr.name.to_string(),
                before,
                after,
                sensitive: attr.sensitive,
            })
        })
        .collect()
}

/// Counts per action across a plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub additions: usize,
    pub changes: usize,
    pub replacements: usize,
    pub removals: usize,
}

impl DiffSummary {
    pub fn from_changes<'a>(changes: impl IntoIterator<Item = &'a PlannedChange>) -> Self {
        let mut summary = Self::default();
        for change in changes {
            match change.action {
                Action::Create => summary.additions += 1,
                Action::Update => summary.changes += 1,
                Action::Replace => summary.replacements += 1,
                Action::Delete => summary.removals += 1,
                Action::NoOp => {}
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.additions + self.changes + self.replacements + self.removals
    }

    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new("stacklet_test")
            .attr(Attribute::computed("id"))
            .attr(Attribute::required("name"))
            .attr(Attribute::write_only("token_wo"))
            .attr(Attribute::ciphertext("token", "token_version"))
    }

    #[test]
    fn test_changed_attributes_skips_write_only() {
        let prior = json!({"id": "1", "name": "a", "token": "ENC"});
        let planned = json!({"id": "1", "name": "b", "token": {"$unknown": true}, "token_wo": "x"});
        let changes = changed_attributes(&schema(), Some(&prior), &planned);
        let names: Vec<_> = changes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["name", "token"]);
        assert!(changes[1].sensitive);
        assert!(changes[1].known_after_apply());
    }

    #[test]
    fn test_create_lists_non_null() {
        let planned = json!({"id": {"$unknown": true}, "name": "a", "token": null});
        let changes = changed_attributes(&schema(), None, &planned);
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn test_summary_counts() {
        let mk = |action| PlannedChange {
            action,
            planned: None,
            changes: Vec::new(),
            replace_paths: Vec::new(),
        };
        let plan = [mk(Action::Create), mk(Action::Replace), mk(Action::NoOp), mk(Action::Delete)];
        let summary = DiffSummary::from_changes(&plan);
        assert_eq!(summary.additions, 1);
        assert_eq!(summary.replacements, 1);
        assert_eq!(summary.removals, 1);
        assert_eq!(summary.total(), 3);
        assert!(summary.has_changes());
    }
}
