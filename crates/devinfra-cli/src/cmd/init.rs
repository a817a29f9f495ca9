use super::{tolerate, Ctx};
use crate::output::print_json;
use anyhow::Context;
use devinfra_core::lifecycle::init;
use devinfra_core::orchestrator::Orchestrator;
use devinfra_core::paths;
use std::path::Path;

pub async fn run(ctx: &Ctx, import_from: Option<&Path>) -> anyhow::Result<()> {
    let config_dir = ctx.config.config_dir.display();
    if ctx.config.is_initialized() && import_from.is_none() {
        if ctx.json {
            print_json(&serde_json::json!({
                "config_dir": ctx.config.config_dir,
                "already_initialized": true,
            }))?;
        }
        ctx.ui.ok(format!("Already initialized at {config_dir}"));
        return Ok(());
    }

    ctx.ui.info(format!("Creating config directory at {config_dir}..."));
    let outcome =
        init::prepare(&ctx.config, import_from).context("failed to prepare config directory")?;
    if let Some(imported) = &outcome.imported {
        if let Some(projects) = imported.projects {
            ctx.ui.ok(format!("Imported projects.yaml ({projects} projects)"));
        }
        ctx.ui.ok(format!(
            "Imported {} certificate file(s) and {} dynamic config(s)",
            imported.certs, imported.dynamic
        ));
    }

    ctx.ui.info("Creating Docker network...");
    let orchestrator = ctx.orchestrator();
    tolerate(
        &ctx.ui,
        "Could not create the docker network",
        orchestrator
            .network_ensure(paths::PROXY_NETWORK, &ctx.cancel)
            .await,
    )?;

    ctx.ui.info("Generating infrastructure certificates...");
    let certs = ctx.certs();
    if let Err(e) = certs.issue_infra(&ctx.cancel).await {
        tolerate(&ctx.ui, "Could not generate infra certs", Err(e))?;
        ctx.ui
            .warn("Ensure mkcert is installed and run 'devinfra init' again.");
    }

    if ctx.json {
        print_json(&outcome)?;
    }
    ctx.ui.ok("Initialization complete!");
    if !ctx.json {
        eprintln!();
        eprintln!("Next steps:");
        eprintln!("  devinfra up      # Start Traefik + DNSMasq");
        eprintln!("  devinfra doctor  # Verify everything works");
    }
    Ok(())
}
