use super::Ctx;
use anyhow::Context;
use clap::Subcommand;
use devinfra_core::certs::CertIssuer;
use devinfra_core::ErrorKind;

#[derive(Subcommand)]
pub enum CertsSubcommand {
    /// Regenerate infrastructure and project certificates, or one project's
    Regen { project: Option<String> },
}

pub async fn run(ctx: &Ctx, subcmd: CertsSubcommand) -> anyhow::Result<()> {
    match subcmd {
        CertsSubcommand::Regen { project } => regen(ctx, project.as_deref()).await,
    }
}

async fn regen(ctx: &Ctx, project: Option<&str>) -> anyhow::Result<()> {
    let registry = ctx.load_registry()?;
    let certs = ctx.certs();

    if let Some(name) = project {
        registry.require(name)?;
        certs
            .issue(name, &ctx.cancel)
            .await
            .with_context(|| format!("failed to regenerate certs for {name}"))?;
        ctx.ui.ok(format!("Certificates regenerated for {name}."));
        return Ok(());
    }

    ctx.ui.info("Regenerating infrastructure certs...");
    certs
        .issue_infra(&ctx.cancel)
        .await
        .context("failed to regenerate infra certs")?;
    let mut failed = 0;
    for p in &registry.projects {
        ctx.ui.info(format!("Regenerating certs for {}...", p.name));
        if let Err(e) = certs.issue(&p.name, &ctx.cancel).await {
            if e.kind() == ErrorKind::Cancelled {
                return Err(e.into());
            }
            ctx.ui
                .warn(format!("Failed to regenerate certs for {}: {e}", p.name));
            failed += 1;
        }
    }
    if failed == 0 {
        ctx.ui.ok("All certificates regenerated.");
    } else {
        ctx.ui
            .warn(format!("{failed} project(s) kept their old certificates."));
    }
    Ok(())
}
