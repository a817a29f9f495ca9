use super::Ctx;
use crate::output::print_json;
use clap::Subcommand;
use devinfra_core::templates;

#[derive(Subcommand)]
pub enum ListSubcommand {
    /// Registered project names
    Projects,
    /// Flavors that can be added to a project
    Flavors,
}

pub fn run(ctx: &Ctx, subcmd: ListSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ListSubcommand::Projects => projects(ctx),
        ListSubcommand::Flavors => flavors(ctx),
    }
}

fn projects(ctx: &Ctx) -> anyhow::Result<()> {
    let names = ctx.load_registry()?.list();
    if ctx.json {
        return print_json(&names);
    }
    if names.is_empty() {
        ctx.ui.info("No projects registered.");
        return Ok(());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

pub fn flavors(ctx: &Ctx) -> anyhow::Result<()> {
    let flavors = templates::available_flavors();
    if ctx.json {
        return print_json(&flavors);
    }
    for flavor in flavors {
        println!("{flavor}");
    }
    Ok(())
}
