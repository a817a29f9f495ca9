use super::{lifecycle, Ctx};
use crate::output::print_json;
use crate::prompt::confirm;
use anyhow::Context;
use devinfra_core::lifecycle::RemoveOptions;
use devinfra_core::paths;

pub async fn run(ctx: &Ctx, name: &str, force: bool, delete_dir: bool) -> anyhow::Result<()> {
    let registry = ctx.load_registry()?;
    let project = registry.require(name)?;

    if !force && !ctx.yes {
        eprintln!("This will remove project '{name}' from devinfra:");
        eprintln!("  - Stop project containers (if running)");
        eprintln!(
            "  - Delete certs for {}",
            paths::wildcard_domain(name)
        );
        eprintln!("  - Delete Traefik dynamic configs");
        eprintln!("  - Remove from {}", paths::REGISTRY_FILE);
        if delete_dir {
            eprintln!("  - DELETE project directory ({})", project.dir.display());
        } else {
            eprintln!();
            eprintln!(
                "  NOTE: The project directory ({}) will NOT be deleted.",
                project.dir.display()
            );
        }
        eprintln!();
        if !confirm("Continue?", false)? {
            ctx.ui.info("Cancelled.");
            return Ok(());
        }
    }

    let certs = ctx.certs();
    let orchestrator = ctx.orchestrator();
    let removed = lifecycle(ctx, &certs, &orchestrator)
        .remove(name, RemoveOptions { delete_dir }, &ctx.cancel)
        .await
        .with_context(|| format!("failed to remove project '{name}'"))?;

    if ctx.json {
        return print_json(&serde_json::json!({
            "removed": removed.name,
            "dir": removed.dir,
            "dir_deleted": delete_dir,
        }));
    }
    ctx.ui.ok(format!("Removed {name}"));
    Ok(())
}
