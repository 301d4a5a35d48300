//! `destroy` - delete everything in state

use anyhow::{Result, bail};
use declarative::ExecuteOptions;

use super::{connect, fail_on, refresh_state};
use crate::Context;
use crate::engine::{differ, executor, planner};
use crate::state::State;
use crate::ui;

pub fn run(ctx: &Context, auto_approve: bool) -> Result<()> {
    let provider = connect(ctx)?;
    let mut state = State::load(&ctx.state)?;
    let api = ctx.operation();

    refresh_state(ctx, &api, &provider, &mut state)?;
    if state.resources.is_empty() {
        state.save(&ctx.state)?;
        ui::info("Nothing to destroy");
        return Ok(());
    }

    let plan = planner::destroy(&provider, &state);
    fail_on(&plan.failures)?;
    differ::display_plan(&plan);
    println!();

    // one at a time, newest first
    let opts = ExecuteOptions {
        dry_run: false,
        jobs: 1,
    };
    let result = executor::apply(&api, plan, &mut state, &opts, auto_approve);
    state.save(&ctx.state)?;
    let summary = result?;

    executor::print_summary(&summary);
    if api.cancel.is_cancelled() {
        bail!("Interrupted; {} left unchanged", ui::count(summary.skipped, "resource"));
    }
    if !summary.is_success() {
        bail!("{} could not be destroyed", ui::count(summary.failed, "resource"));
    }
    Ok(())
}
