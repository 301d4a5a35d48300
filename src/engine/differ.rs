//! Plan display

use super::planner::{Failure, Plan};
use colored::{ColoredString, Colorize};
use declarative::{Action, AttributeChange, DiffSummary, PendingChange};
use serde_json::Value as Json;

const SENSITIVE: &str = "(sensitive value)";
const KNOWN_AFTER_APPLY: &str = "(known after apply)";

fn colored_symbol(action: Action) -> ColoredString {
    match action {
        Action::Create => action.symbol().green(),
        Action::Update => action.symbol().yellow(),
        Action::Replace => action.symbol().red(),
        Action::Delete => action.symbol().red(),
        Action::NoOp => action.symbol().dimmed(),
    }
}

/// Render one side of a change
pub fn format_value(value: &Json, sensitive: bool) -> String {
    if declarative::value::is_unknown_marker(value) {
        return KNOWN_AFTER_APPLY.to_string();
    }
    if value.is_null() {
        return "null".to_string();
    }
    if sensitive {
        return SENSITIVE.to_string();
    }
    let rendered = value.to_string();
    if rendered.len() > 80 {
        format!("{}...", rendered.chars().take(77).collect::<String>())
    } else {
        rendered
    }
}

/// `name: before -> after`, with the replacement marker when it forces one
pub fn change_line(change: &AttributeChange, action: Action, forces_replacement: bool) -> String {
    let after = format_value(&change.after, change.sensitive);
    let mut line = match action {
        Action::Create => format!("{} = {after}", change.name),
        Action::Delete => format!("{} = {}", change.name, format_value(&change.before, change.sensitive)),
        _ => format!(
            "{}: {} -> {after}",
            change.name,
            format_value(&change.before, change.sensitive)
        ),
    };
    if forces_replacement {
        line.push_str(" # forces replacement");
    }
    line
}

fn display_change(pending: &PendingChange) {
    let change = &pending.change;
    println!(
        "  {} {} {}",
        colored_symbol(change.action),
        pending.address.bold(),
        format!("will be {}d", change.action).dimmed()
    );
    for attr in &change.changes {
        // Unchanged nulls on a fresh create carry no information
        if change.action == Action::Create && attr.after.is_null() {
            continue;
        }
        let forces = change.replace_paths.iter().any(|p| p == &attr.name);
        let line = change_line(attr, change.action, forces);
        if forces {
            println!("      {}", line.red());
        } else {
            println!("      {line}");
        }
    }
}

/// Print every change in the plan, then the totals
pub fn display_plan(plan: &Plan) {
    let changes: Vec<&PendingChange> = plan.changes().collect();
    if changes.is_empty() {
        println!();
        println!("  {} No changes. Remote matches the manifest.", "✓".green());
        return;
    }

    println!();
    for pending in &changes {
        display_change(pending);
        println!();
    }
    println!("  {}", summary_line(&plan.summary()).bold());
}

pub fn summary_line(summary: &DiffSummary) -> String {
    let mut line = format!(
        "Plan: {} to add, {} to change, {} to destroy.",
        summary.additions + summary.replacements,
        summary.changes,
        summary.removals + summary.replacements
    );
    if summary.replacements > 0 {
        line.push_str(&format!(" ({} replaced)", summary.replacements));
    }
    line
}

/// Print failed addresses as `(summary, detail)` diagnostics
pub fn display_failures(failures: &[Failure]) {
    for failure in failures {
        for diagnostic in failure.error.to_diagnostics(failure.operation) {
            let location = match &diagnostic.path {
                Some(path) => format!("{}.{path}", failure.address),
                None => failure.address.clone(),
            };
            let mark = if diagnostic.is_error() { "✗".red() } else { "⚠".yellow() };
            println!("  {} {}: {}", mark, diagnostic.summary.bold(), location);
            println!("      {}", diagnostic.detail);
        }
        println!("      {}", failure.error.category().advice().dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn change(name: &str, before: Json, after: Json, sensitive: bool) -> AttributeChange {
        AttributeChange {
            name: name.to_string(),
            before,
            after,
            sensitive,
        }
    }

    #[test]
    fn test_sensitive_values_redacted() {
        let line = change_line(&change("client_secret", json!("ENC1"), json!("ENC2"), true), Action::Update, false);
        assert_eq!(line, "client_secret: (sensitive value) -> (sensitive value)");
        assert!(!line.contains("ENC"));
    }

    #[test]
    fn test_unknown_rendered_as_known_after_apply() {
        let line = change_line(&change("id", Json::Null, json!({"$unknown": true}), false), Action::Create, false);
        assert_eq!(line, "id = (known after apply)");
    }

    #[test]
    fn test_replacement_marker() {
        let line = change_line(&change("name", json!("a"), json!("b"), false), Action::Replace, true);
        assert_eq!(line, "name: \"a\" -> \"b\" # forces replacement");
    }

    #[test]
    fn test_long_values_truncated() {
        let long = json!("x".repeat(200));
        assert_eq!(format_value(&long, false).len(), 80);
    }

    #[test]
    fn test_summary_counts_replacements_twice() {
        let summary = DiffSummary {
            additions: 1,
            changes: 2,
            replacements: 1,
            removals: 0,
        };
        assert_eq!(summary_line(&summary), "Plan: 2 to add, 2 to change, 1 to destroy. (1 replaced)");
    }
}
