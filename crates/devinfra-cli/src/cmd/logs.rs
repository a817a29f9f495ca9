use super::Ctx;
use devinfra_core::orchestrator::Orchestrator;
use devinfra_core::ErrorKind;

/// Follow logs until interrupted. Ctrl-C ends the command successfully.
pub async fn run(ctx: &Ctx, project: Option<&str>) -> anyhow::Result<()> {
    let orchestrator = ctx.orchestrator();
    let result = match project {
        None => orchestrator.infra_logs(&ctx.cancel).await,
        Some(name) => {
            let registry = ctx.load_registry()?;
            let p = registry.require(name)?;
            orchestrator
                .logs(&p.name, &p.dir, &p.compose_files(), &ctx.cancel)
                .await
        }
    };
    match result {
        Err(e) if e.kind() == ErrorKind::Cancelled => Ok(()),
        other => Ok(other?),
    }
}
