use super::{lifecycle, Ctx};
use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum FlavorSubcommand {
    /// Add a flavor overlay (postgres, redis, ...) to a project
    Add { project: String, flavor: String },
    /// List available flavors
    List,
}

pub fn run(ctx: &Ctx, subcmd: FlavorSubcommand) -> anyhow::Result<()> {
    match subcmd {
        FlavorSubcommand::Add { project, flavor } => add(ctx, &project, &flavor),
        FlavorSubcommand::List => super::list::flavors(ctx),
    }
}

fn add(ctx: &Ctx, project: &str, flavor: &str) -> anyhow::Result<()> {
    let certs = ctx.certs();
    let orchestrator = ctx.orchestrator();
    let file = lifecycle(ctx, &certs, &orchestrator)
        .add_flavor(project, flavor)
        .with_context(|| format!("failed to add flavor '{flavor}' to {project}"))?;

    if ctx.json {
        return print_json(&serde_json::json!({
            "project": project,
            "flavor": flavor,
            "file": file,
        }));
    }
    ctx.ui.ok(format!("Added {flavor} to {project}"));
    ctx.ui
        .info(format!("Restart the project to apply: devinfra up {project}"));
    Ok(())
}
