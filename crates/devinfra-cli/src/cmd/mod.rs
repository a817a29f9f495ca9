pub mod add;
pub mod certs;
pub mod clean;
pub mod doctor;
pub mod down;
pub mod flavor;
pub mod init;
pub mod inspect;
pub mod list;
pub mod logs;
pub mod new;
pub mod remove;
pub mod status;
pub mod up;
pub mod version;

use crate::ui::Ui;
use anyhow::Context;
use devinfra_core::artifacts;
use devinfra_core::certs::Mkcert;
use devinfra_core::lifecycle::Lifecycle;
use devinfra_core::orchestrator::{DockerCompose, RunningMap};
use devinfra_core::{Config, DevinfraError, ErrorKind, Project, Registry, Service};
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Everything a command needs, resolved once in `main`.
pub struct Ctx {
    pub config: Config,
    pub json: bool,
    pub yes: bool,
    pub ui: Ui,
    pub cancel: CancellationToken,
}

impl Ctx {
    pub fn load_registry(&self) -> anyhow::Result<Registry> {
        Registry::load(&self.config.registry_path()).context("failed to load project registry")
    }

    pub fn certs(&self) -> Mkcert {
        Mkcert::new(&self.config)
    }

    pub fn orchestrator(&self) -> DockerCompose {
        DockerCompose::new(&self.config)
    }
}

/// Build the lifecycle engine over the production collaborators.
pub fn lifecycle<'a>(
    ctx: &'a Ctx,
    certs: &'a Mkcert,
    orchestrator: &'a DockerCompose,
) -> Lifecycle<'a, Mkcert, DockerCompose> {
    Lifecycle::new(&ctx.config, certs, orchestrator)
}

/// Log a failed best-effort step and carry on. Cancellation still aborts.
pub fn tolerate(ui: &Ui, what: &str, result: devinfra_core::Result<()>) -> anyhow::Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::Cancelled => Err(e.into()),
        Err(e) => {
            ui.warn(format!("{what}: {e}"));
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Project views shared by status and inspect
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ProjectView {
    pub name: String,
    pub dir: PathBuf,
    pub domain: String,
    pub mode: &'static str,
    pub status: &'static str,
    pub services: Vec<Service>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flavors: Vec<String>,
    pub urls: Vec<String>,
    pub created_at: String,
}

impl ProjectView {
    pub fn new(project: &Project, running: &RunningMap) -> Self {
        Self {
            name: project.name.clone(),
            dir: project.dir.clone(),
            domain: project.domain.clone(),
            mode: project.mode(),
            status: run_status(project, running),
            services: project.services.clone(),
            flavors: project.flavors.clone(),
            urls: artifacts::urls(&project.name, &project.services),
            created_at: project.created_at.to_string(),
        }
    }
}

/// `host` for host-mode projects, otherwise whether any of the project's
/// containers are up.
pub fn run_status(project: &Project, running: &RunningMap) -> &'static str {
    if project.host_mode {
        "host"
    } else if running.contains_key(&project.name) {
        "running"
    } else {
        "stopped"
    }
}

/// One `docker ps`; an unreachable docker reads as "nothing running".
pub async fn running_map(ctx: &Ctx, orchestrator: &DockerCompose) -> anyhow::Result<RunningMap> {
    use devinfra_core::orchestrator::Orchestrator;
    match orchestrator.list_running(&ctx.cancel).await {
        Ok(map) => Ok(map),
        Err(DevinfraError::Cancelled(what)) => Err(DevinfraError::Cancelled(what).into()),
        Err(e) => {
            ctx.ui.warn(format!("Could not query container status: {e}"));
            Ok(RunningMap::new())
        }
    }
}
