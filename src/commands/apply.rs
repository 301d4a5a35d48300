//! `apply` - make the remote match the manifest

use anyhow::{Result, bail};
use declarative::ExecuteOptions;

use super::{connect, fail_on, refresh_state};
use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{differ, executor, planner};
use crate::manifest::Manifest;
use crate::state::State;
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let provider = connect(ctx)?;
    let manifest = Manifest::load(&ctx.manifest)?;
    let mut state = State::load(&ctx.state)?;
    let api = ctx.operation();

    refresh_state(ctx, &api, &provider, &mut state)?;
    let plan = planner::plan(&provider, &manifest, &state);
    fail_on(&plan.failures)?;
    differ::display_plan(&plan);

    if plan.changes().next().is_none() {
        state.save(&ctx.state)?;
        return Ok(());
    }

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        jobs: usize::from(args.jobs),
    };
    println!();
    let result = executor::apply(&api, plan, &mut state, &opts, args.auto_approve);
    // saved even when some resources failed
    state.save(&ctx.state)?;
    let summary = result?;

    if args.dry_run {
        println!();
        ui::info("Dry run - no changes made");
        return Ok(());
    }
    executor::print_summary(&summary);
    if api.cancel.is_cancelled() {
        bail!("Interrupted; {} left unchanged", ui::count(summary.skipped, "resource"));
    }
    if !summary.is_success() {
        bail!("{} could not be applied", ui::count(summary.failed, "resource"));
    }
    Ok(())
}
