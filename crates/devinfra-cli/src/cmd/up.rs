use super::Ctx;
use crate::prompt::confirm;
use anyhow::{bail, Context};
use devinfra_core::orchestrator::{DockerCompose, Orchestrator};

pub async fn run(ctx: &Ctx, project: Option<&str>, all: bool) -> anyhow::Result<()> {
    let orchestrator = ctx.orchestrator();

    if all {
        ensure_infra(ctx, &orchestrator, true).await?;
        let registry = ctx.load_registry()?;
        for p in &registry.projects {
            if p.host_mode {
                ctx.ui.warn(format!("Skipping host-mode project {}", p.name));
                continue;
            }
            ctx.ui.info(format!("Starting {}...", p.name));
            match orchestrator
                .up(&p.name, &p.dir, &p.compose_files(), &ctx.cancel)
                .await
            {
                Ok(()) => ctx.ui.ok(format!("Started {}", p.name)),
                Err(e) => super::tolerate(&ctx.ui, &format!("Failed to start {}", p.name), Err(e))?,
            }
        }
        return Ok(());
    }

    let Some(name) = project else {
        return start_infra(ctx, &orchestrator).await;
    };

    let registry = ctx.load_registry()?;
    let p = registry.require(name)?;
    ensure_infra(ctx, &orchestrator, ctx.yes).await?;

    ctx.ui.info(format!("Starting {name}..."));
    orchestrator
        .up(&p.name, &p.dir, &p.compose_files(), &ctx.cancel)
        .await
        .with_context(|| format!("failed to start {name}"))?;
    ctx.ui.ok(format!("Started {name}"));
    Ok(())
}

/// Start the core stack unless traefik is already up. Without `auto` the
/// operator is asked first.
async fn ensure_infra(ctx: &Ctx, orchestrator: &DockerCompose, auto: bool) -> anyhow::Result<()> {
    if orchestrator.infra_running(&ctx.cancel).await {
        return Ok(());
    }
    if !auto {
        eprintln!("Core infrastructure is not running.");
        if !confirm("Start it now?", true)? {
            bail!("core infrastructure must be running first; run 'devinfra up'");
        }
    }
    start_infra(ctx, orchestrator).await
}

async fn start_infra(ctx: &Ctx, orchestrator: &DockerCompose) -> anyhow::Result<()> {
    ctx.ui.info("Starting core infrastructure...");
    orchestrator
        .infra_up(&ctx.cancel)
        .await
        .context("failed to start infrastructure")?;
    ctx.ui.ok("Core infrastructure started.");
    Ok(())
}
