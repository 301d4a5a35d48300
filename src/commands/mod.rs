//! Subcommand implementations

pub mod apply;
pub mod destroy;
pub mod import;
pub mod plan;
pub mod platform;
pub mod refresh;

use anyhow::{Result, bail};

use crate::Context;
use crate::config::ProviderConfig;
use crate::engine::{Failure, differ, planner};
use crate::provider::Provider;
use crate::state::State;
use crate::ui;

/// Load provider configuration and connect
pub(crate) fn connect(ctx: &Context) -> Result<Provider> {
    let config = ProviderConfig::load(ctx.config.as_deref())?;
    log::debug!("{config:?}");
    Ok(Provider::connect(&config)?)
}

/// Refresh state in place, reporting removed addresses
///
/// Fails when any resource could not be read; state is left unsaved.
pub(crate) fn refresh_state(
    ctx: &Context,
    api: &declarative::Context,
    provider: &Provider,
    state: &mut State,
) -> Result<()> {
    if state.resources.is_empty() {
        return Ok(());
    }
    if !ctx.quiet {
        ui::info(&format!("Refreshing {}...", ui::count(state.resources.len(), "resource")));
    }
    let outcome = planner::refresh(api, provider, state);
    for address in &outcome.removed {
        ui::warn(&format!("{address} no longer exists and was removed from state"));
    }
    fail_on(&outcome.failures)
}

/// Print diagnostics and bail if anything failed
pub(crate) fn fail_on(failures: &[Failure]) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    println!();
    differ::display_failures(failures);
    bail!("{} failed", ui::count(failures.len(), "resource"))
}
