use super::{running_map, Ctx, ProjectView};
use crate::output::print_json;
use devinfra_core::orchestrator::RunningMap;

pub async fn run(ctx: &Ctx, name: &str) -> anyhow::Result<()> {
    let registry = ctx.load_registry()?;
    let project = registry.require(name)?;

    let running = if project.host_mode {
        RunningMap::new()
    } else {
        running_map(ctx, &ctx.orchestrator()).await?
    };
    let view = ProjectView::new(project, &running);

    if ctx.json {
        return print_json(&view);
    }

    println!("Name:      {}", view.name);
    println!("Directory: {}", view.dir.display());
    println!("Domain:    {}", view.domain);
    println!("Mode:      {}", view.mode);
    println!("Status:    {}", view.status);
    println!("Created:   {}", view.created_at);
    println!();
    println!("Services:");
    for svc in &view.services {
        println!("  {}:{}", svc.name, svc.port);
    }
    if !view.flavors.is_empty() {
        println!();
        println!("Flavors:   {}", view.flavors.join(", "));
    }
    println!();
    println!("URLs:");
    for url in &view.urls {
        println!("  {url}");
    }
    Ok(())
}
