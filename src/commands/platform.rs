//! `platform` - show deployment details

use anyhow::Result;
use super::connect;
use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let provider = connect(ctx)?;
    let platform = provider.api().platform().platform(&ctx.cancel)?;

    ui::header("Stacklet platform");
    ui::kv("External ID", &platform.external_id);
    ui::kv("Execution regions", &platform.execution_regions.join(", "));
    ui::kv("Default role", platform.default_role.as_deref().unwrap_or("-"));
    Ok(())
}
