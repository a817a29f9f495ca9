use super::{lifecycle, Ctx};
use crate::output::print_json;
use anyhow::Context;
use devinfra_core::git::{self, GitCli, ImportSource};
use devinfra_core::lifecycle::ImportRequest;
use devinfra_core::{artifacts, canonical, validate};

pub async fn run(
    ctx: &Ctx,
    source: &str,
    name: Option<String>,
    dir: Option<String>,
    services: Option<String>,
) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    let home = home::home_dir();
    let source = match git::classify_input(source) {
        ImportSource::LocalPath(path) => ImportSource::LocalPath(
            canonical::canonicalize(&canonical::expand_user(&path, home.as_deref(), &cwd))
                .to_string_lossy()
                .into_owned(),
        ),
        url => url,
    };
    let services = services
        .map(|spec| validate::parse_services(&spec, &ctx.config.reserved_ports()))
        .transpose()?;
    let req = ImportRequest {
        source,
        name,
        dir: dir.map(|d| canonical::expand_user(&d, home.as_deref(), &cwd)),
        clone_root: home.map(|h| h.join("projects")),
        services,
    };

    let certs = ctx.certs();
    let orchestrator = ctx.orchestrator();
    let project = lifecycle(ctx, &certs, &orchestrator)
        .import(&req, &GitCli::default(), &ctx.cancel)
        .await
        .context("failed to add project")?;

    if ctx.json {
        return print_json(&project);
    }
    ctx.ui.ok(format!(
        "Registered {} at {}",
        project.name,
        project.dir.display()
    ));
    if project.services.is_empty() {
        ctx.ui
            .info("No services with published ports; registered without routing.");
    }
    for url in artifacts::urls(&project.name, &project.services) {
        println!("  {url}");
    }
    Ok(())
}
