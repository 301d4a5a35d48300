//! Execution - terminal callbacks around the parallel executor

use anyhow::Result;
use colored::Colorize;
use declarative::{Applied, ApplyResult, ConfirmCallback, Context, ExecuteOptions, ExecuteSummary, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};

use super::planner::Plan;
use crate::state::State;

/// Progress bar over the applied resources
#[derive(Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
}

impl ProgressCallback for BarProgress {
    fn on_batch_start(&mut self, count: usize) {
        let pb = ProgressBar::new(count as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=>-"));
        }
        pb.set_message("Applying");
        self.bar = Some(pb);
    }

    fn on_resource_complete(&mut self, address: &str, result: &ApplyResult) {
        let symbol = match result {
            ApplyResult::NoChange => "○",
            ApplyResult::Created | ApplyResult::Modified | ApplyResult::Replaced | ApplyResult::Removed => "✓",
            ApplyResult::Failed { .. } => "✗",
            ApplyResult::Skipped { .. } => "⊘",
        };
        if let Some(pb) = &self.bar {
            pb.set_message(format!("{symbol} {address}"));
            pb.inc(1);
        }
    }

    fn on_batch_complete(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}

/// Interactive confirmation, or a fixed answer with `--auto-approve`
pub struct Prompt {
    pub auto_approve: bool,
}

impl ConfirmCallback for Prompt {
    fn confirm(&mut self, prompt: &str) -> declarative::Result<bool> {
        if self.auto_approve {
            return Ok(true);
        }
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| declarative::Error::InvalidState(format!("confirmation failed: {e}")))
    }
}

/// Apply the plan and record every outcome in state
///
/// State is updated for successes and failures alike; a failed address
/// keeps its prior record.
pub fn apply(
    ctx: &Context,
    plan: Plan,
    state: &mut State,
    opts: &ExecuteOptions,
    auto_approve: bool,
) -> Result<ExecuteSummary> {
    let mut progress = BarProgress::default();
    let mut confirm = Prompt { auto_approve };
    let (summary, applied) = declarative::execute(ctx, plan.pending, opts, &mut progress, &mut confirm)?;
    record(state, applied)?;
    Ok(summary)
}

fn record(state: &mut State, applied: Vec<Applied>) -> Result<()> {
    for outcome in applied {
        if let ApplyResult::Failed { error } = &outcome.result {
            println!("  {} {}: {}", "✗".red(), outcome.address.bold(), error);
        }
        state.record(&outcome.address, outcome.state)?;
    }
    Ok(())
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.skipped > 0 && summary.total_changes() == 0 && summary.failed == 0 {
        println!("  {} No changes applied", "ℹ".blue());
    } else if summary.is_success() {
        println!("  {} Apply complete!", "✓".green().bold());
    } else {
        println!("  {} Apply finished with errors", "⚠".yellow().bold());
    }

    let lines = [
        (summary.created, "created"),
        (summary.modified, "updated"),
        (summary.replaced, "replaced"),
        (summary.removed, "destroyed"),
        (summary.skipped, "skipped"),
    ];
    for (count, label) in lines {
        if count > 0 {
            println!("    • {count} resources {label}");
        }
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::planner;
    use crate::manifest::Manifest;
    use crate::provider::Provider;
    use crate::resource::testing;
    use serde_json::json;

    fn setup() -> (Provider, graphql::MockTransport) {
        let (api, mock) = testing::api();
        (Provider::new(api), mock)
    }

    const MANIFEST: &str = r#"
[[resource]]
type = "stacklet_sso_group"
name = "admins"
attributes = { name = "platform-admins", roles = ["viewer"] }
"#;

    #[test]
    fn test_apply_records_state() {
        let (provider, mock) = setup();
        mock.reply(
            "addSSOGroup",
            json!({"addSSOGroup": {"group": {
                "id": "g-1", "name": "platform-admins", "roles": ["viewer"], "accountGroupUUIDs": []
            }, "problems": []}}),
        );
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let mut state = State::default();
        let plan = planner::plan(&provider, &manifest, &state);

        let summary = apply(&Context::new(), plan, &mut state, &ExecuteOptions::default(), true).unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(state.get("stacklet_sso_group.admins").unwrap().attributes["id"], json!("g-1"));

        // second plan against the recorded state is empty
        let again = planner::plan(&provider, &manifest, &state);
        assert_eq!(again.changes().count(), 0);
    }

    #[test]
    fn test_dry_run_leaves_state_alone() {
        let (provider, mock) = setup();
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let mut state = State::default();
        let plan = planner::plan(&provider, &manifest, &state);
        let opts = ExecuteOptions {
            dry_run: true,
            ..ExecuteOptions::default()
        };

        let summary = apply(&Context::new(), plan, &mut state, &opts, true).unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(state.resources.is_empty());
        assert_eq!(mock.mutation_count(), 0);
    }

    #[test]
    fn test_failure_keeps_prior_record() {
        let (provider, mock) = setup();
        mock.reply(
            "removeSSOGroup",
            json!({"removeSSOGroup": {"group": null, "problems": [
                {"__typename": "AccessDenied", "message": "nope"}
            ]}}),
        );
        let mut state = State::default();
        state.set("stacklet_sso_group", "old", json!({"id": "g-9", "name": "old", "roles": ["viewer"]}));
        let plan = planner::destroy(&provider, &state);

        let summary = apply(&Context::new(), plan, &mut state, &ExecuteOptions::default(), true).unwrap();
        assert_eq!(summary.failed, 1);
        assert!(state.get("stacklet_sso_group.old").is_some());
    }

    #[test]
    fn test_interrupt_sends_nothing() {
        let (provider, mock) = setup();
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let mut state = State::default();
        let plan = planner::plan(&provider, &manifest, &state);
        let ctx = Context::new();
        ctx.cancel.cancel();

        let summary = apply(&ctx, plan, &mut state, &ExecuteOptions::default(), true).unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(state.resources.is_empty());
        assert_eq!(mock.mutation_count(), 0);
    }

    #[test]
    fn test_auto_approve_skips_prompt() {
        let mut prompt = Prompt { auto_approve: true };
        assert!(prompt.confirm("Apply changes?").unwrap());
    }
}
