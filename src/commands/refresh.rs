//! `refresh` - sync state with the remote

use anyhow::{Result, bail};

use super::connect;
use crate::Context;
use crate::engine::{differ, planner};
use crate::state::State;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let provider = connect(ctx)?;
    let mut state = State::load(&ctx.state)?;
    if state.resources.is_empty() {
        ui::info("State is empty, nothing to refresh");
        return Ok(());
    }

    let total = state.resources.len();
    let outcome = planner::refresh(&ctx.operation(), &provider, &mut state);
    // keep what was read even if some resources failed
    state.save(&ctx.state)?;

    for address in &outcome.removed {
        ui::warn(&format!("{address} no longer exists and was removed from state"));
    }
    if !outcome.failures.is_empty() {
        differ::display_failures(&outcome.failures);
        bail!("{} could not be read", ui::count(outcome.failures.len(), "resource"));
    }
    ui::success(&format!(
        "Refreshed {} ({} removed)",
        ui::count(total - outcome.removed.len(), "resource"),
        outcome.removed.len()
    ));
    Ok(())
}
