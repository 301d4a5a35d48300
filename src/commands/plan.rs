//! `plan` - preview changes without touching the remote

use anyhow::Result;

use super::{connect, fail_on, refresh_state};
use crate::Context;
use crate::engine::{differ, planner};
use crate::manifest::Manifest;
use crate::state::State;

pub fn run(ctx: &Context) -> Result<()> {
    let provider = connect(ctx)?;
    let manifest = Manifest::load(&ctx.manifest)?;
    let mut state = State::load(&ctx.state)?;

    refresh_state(ctx, &ctx.operation(), &provider, &mut state)?;
    let plan = planner::plan(&provider, &manifest, &state);
    fail_on(&plan.failures)?;
    differ::display_plan(&plan);
    Ok(())
}
