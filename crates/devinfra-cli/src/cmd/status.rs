use super::{running_map, Ctx, ProjectView};
use crate::output::{print_json, print_status};

pub async fn run(ctx: &Ctx) -> anyhow::Result<()> {
    let registry = ctx.load_registry()?;
    if registry.is_empty() {
        if ctx.json {
            return print_json(&serde_json::json!({ "projects": [] }));
        }
        ctx.ui
            .info("No projects registered yet. Create one with: devinfra new");
        return Ok(());
    }

    let needs_docker = registry.projects.iter().any(|p| !p.host_mode);
    let running = if needs_docker {
        running_map(ctx, &ctx.orchestrator()).await?
    } else {
        Default::default()
    };
    let views: Vec<ProjectView> = registry
        .projects
        .iter()
        .map(|p| ProjectView::new(p, &running))
        .collect();

    if ctx.json {
        return print_json(&serde_json::json!({ "projects": views }));
    }

    println!();
    print_status(&views);
    println!();
    Ok(())
}
