use super::{tolerate, Ctx};
use crate::output::print_json;
use crate::prompt::confirm;
use anyhow::Context;
use devinfra_core::lifecycle::clean;

pub async fn run(ctx: &Ctx, force: bool) -> anyhow::Result<()> {
    if !force && !ctx.yes {
        eprintln!("This will:");
        eprintln!("  - Stop core infrastructure");
        eprintln!("  - Remove all certificates");
        eprintln!("  - Remove all Traefik dynamic configs");
        eprintln!("  - Keep projects.yaml");
        eprintln!();
        if !confirm("Continue?", false)? {
            ctx.ui.info("Cancelled.");
            return Ok(());
        }
    }

    ctx.ui.info("Stopping infrastructure...");
    tolerate(
        &ctx.ui,
        "Could not stop infrastructure",
        ctx.orchestrator().infra_down(&ctx.cancel).await,
    )?;

    let removed = clean::purge_generated(&ctx.config).context("failed to remove generated files")?;
    if ctx.json {
        return print_json(&serde_json::json!({ "removed": removed }));
    }
    ctx.ui.ok(format!("Cleaned ({} files removed).", removed.len()));
    Ok(())
}
