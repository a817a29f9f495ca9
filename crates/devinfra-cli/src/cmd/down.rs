use super::Ctx;
use anyhow::Context;
use devinfra_core::orchestrator::Orchestrator;

pub async fn run(ctx: &Ctx, project: Option<&str>, all: bool) -> anyhow::Result<()> {
    let orchestrator = ctx.orchestrator();

    if all {
        let registry = ctx.load_registry()?;
        for p in registry.projects.iter().filter(|p| !p.host_mode) {
            ctx.ui.info(format!("Stopping {}...", p.name));
            match orchestrator
                .down(&p.name, &p.dir, &p.compose_files(), &ctx.cancel)
                .await
            {
                Ok(()) => ctx.ui.ok(format!("Stopped {}", p.name)),
                Err(e) => super::tolerate(&ctx.ui, &format!("Failed to stop {}", p.name), Err(e))?,
            }
        }
        return Ok(());
    }

    let Some(name) = project else {
        ctx.ui.info("Stopping core infrastructure...");
        orchestrator
            .infra_down(&ctx.cancel)
            .await
            .context("failed to stop infrastructure")?;
        ctx.ui.ok("Core infrastructure stopped.");
        return Ok(());
    };

    let registry = ctx.load_registry()?;
    let p = registry.require(name)?;
    ctx.ui.info(format!("Stopping {name}..."));
    orchestrator
        .down(&p.name, &p.dir, &p.compose_files(), &ctx.cancel)
        .await
        .with_context(|| format!("failed to stop {name}"))?;
    ctx.ui.ok(format!("Stopped {name}"));
    Ok(())
}
