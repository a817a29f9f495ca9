use super::{lifecycle, Ctx};
use crate::output::print_json;
use anyhow::Context;
use clap::Args;
use devinfra_core::lifecycle::{CreateRequest, Mode};
use devinfra_core::{artifacts, canonical, validate};

#[derive(Args)]
pub struct NewArgs {
    /// Project name (lowercase letters, digits and hyphens)
    #[arg(long)]
    pub name: String,

    /// Project directory; must not exist or be empty
    #[arg(long)]
    pub dir: String,

    /// docker (services run in containers) or host (services run on this machine)
    #[arg(long, default_value = "docker")]
    pub mode: String,

    /// Comma-separated name:port pairs (default: web:3000)
    #[arg(long)]
    pub services: Option<String>,

    /// Comma-separated flavors, e.g. postgres,redis
    #[arg(long, value_delimiter = ',')]
    pub flavors: Vec<String>,
}

pub async fn run(ctx: &Ctx, args: NewArgs) -> anyhow::Result<()> {
    let mode: Mode = args.mode.parse()?;
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    let dir = canonical::expand_user(&args.dir, home::home_dir().as_deref(), &cwd);
    let services = match &args.services {
        Some(spec) => validate::parse_services(spec, &ctx.config.reserved_ports())?,
        None => validate::default_services(),
    };
    let req = CreateRequest {
        name: args.name,
        dir,
        mode,
        services,
        flavors: args.flavors,
    };

    ctx.ui.info(format!("Creating {} in {}...", req.name, req.dir.display()));
    let certs = ctx.certs();
    let orchestrator = ctx.orchestrator();
    let project = lifecycle(ctx, &certs, &orchestrator)
        .create(&req, &ctx.cancel)
        .await
        .with_context(|| format!("failed to create project '{}'", req.name))?;

    if ctx.json {
        return print_json(&project);
    }
    ctx.ui.ok(format!("Created {} ({} mode)", project.name, mode));
    println!("Directory: {}", project.dir.display());
    for url in artifacts::urls(&project.name, &project.services) {
        println!("  {url}");
    }
    Ok(())
}
