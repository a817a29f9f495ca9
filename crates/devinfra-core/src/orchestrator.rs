use crate::config::Config;
use crate::error::{DevinfraError, Result};
use crate::paths;
use crate::process::{OutputMode, ToolCommand, ToolRunner};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project=";

/// Compose project name -> running container names.
pub type RunningMap = BTreeMap<String, Vec<String>>;

/// Starts, stops and inspects containers.
///
/// Project operations run under the compose project name `project`, which
/// is what [`Orchestrator::list_running`] groups by.
pub trait Orchestrator: Send + Sync {
    fn up(
        &self,
        project: &str,
        dir: &Path,
        files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<()>> + Send;

    fn down(
        &self,
        project: &str,
        dir: &Path,
        files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Stream logs to the terminal until the user interrupts.
    fn logs(
        &self,
        project: &str,
        dir: &Path,
        files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<()>> + Send;

    fn list_running(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<RunningMap>> + Send;

    /// Create the docker network `name` unless it already exists.
    fn network_ensure(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// [`Orchestrator`] driving `docker compose`.
#[derive(Debug, Clone)]
pub struct DockerCompose {
    compose_dir: PathBuf,
    dns_port: u16,
    runner: ToolRunner,
}

impl DockerCompose {
    pub fn new(config: &Config) -> Self {
        Self {
            compose_dir: config.compose_dir(),
            dns_port: config.dns_port,
            runner: ToolRunner,
        }
    }

    fn docker(&self) -> ToolCommand {
        ToolCommand::new("docker").env("DNS_PORT", self.dns_port.to_string())
    }

    fn project_compose(&self, project: &str, dir: &Path, files: &[PathBuf]) -> ToolCommand {
        let mut cmd = self
            .docker()
            .args(["compose", "-p", project])
            .current_dir(dir);
        for file in files {
            cmd = cmd.arg("-f").arg(file);
        }
        cmd
    }

    fn infra_compose(&self) -> ToolCommand {
        self.docker()
            .args(["compose", "-p", paths::INFRA_PROJECT])
            .current_dir(&self.compose_dir)
    }

    // ---------------------------------------------------------------------------
    // Core infrastructure stack
    // ---------------------------------------------------------------------------

    pub async fn infra_up(&self, cancel: &CancellationToken) -> Result<()> {
        info!("starting infrastructure");
        let cmd = self.infra_compose().args(["up", "-d"]);
        self.runner.run(&cmd, OutputMode::Progress, cancel).await?;
        Ok(())
    }

    pub async fn infra_down(&self, cancel: &CancellationToken) -> Result<()> {
        info!("stopping infrastructure");
        let cmd = self.infra_compose().arg("down");
        self.runner.run(&cmd, OutputMode::Progress, cancel).await?;
        Ok(())
    }

    pub async fn infra_logs(&self, cancel: &CancellationToken) -> Result<()> {
        let cmd = self.infra_compose().args(["logs", "-f"]);
        self.runner.run(&cmd, OutputMode::Attached, cancel).await?;
        Ok(())
    }

    /// True when the traefik container reports itself running.
    pub async fn infra_running(&self, cancel: &CancellationToken) -> bool {
        container_running(&self.runner, "traefik", cancel).await
    }
}

/// `docker inspect` a single container's running state. Any failure reads
/// as "not running".
pub async fn container_running(
    runner: &ToolRunner,
    container: &str,
    cancel: &CancellationToken,
) -> bool {
    let cmd = ToolCommand::new("docker").args(["inspect", "-f", "{{.State.Running}}", container]);
    match runner.run(&cmd, OutputMode::Captured, cancel).await {
        Ok(out) => out.stdout.trim() == "true",
        Err(e) => {
            debug!(container, error = %e, "inspect failed");
            false
        }
    }
}

impl Orchestrator for DockerCompose {
    async fn up(
        &self,
        project: &str,
        dir: &Path,
        files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let cmd = self.project_compose(project, dir, files).args(["up", "-d"]);
        self.runner.run(&cmd, OutputMode::Progress, cancel).await?;
        Ok(())
    }

    async fn down(
        &self,
        project: &str,
        dir: &Path,
        files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let cmd = self.project_compose(project, dir, files).arg("down");
        self.runner.run(&cmd, OutputMode::Progress, cancel).await?;
        Ok(())
    }

    async fn logs(
        &self,
        project: &str,
        dir: &Path,
        files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let cmd = self.project_compose(project, dir, files).args(["logs", "-f"]);
        self.runner.run(&cmd, OutputMode::Attached, cancel).await?;
        Ok(())
    }

    async fn list_running(&self, cancel: &CancellationToken) -> Result<RunningMap> {
        let cmd = ToolCommand::new("docker").args([
            "ps",
            "--filter",
            "status=running",
            "--format",
            "{{.Labels}}\t{{.Names}}",
        ]);
        let out = self.runner.run(&cmd, OutputMode::Captured, cancel).await?;
        Ok(parse_running(&out.stdout))
    }

    async fn network_ensure(&self, name: &str, cancel: &CancellationToken) -> Result<()> {
        let inspect = ToolCommand::new("docker").args(["network", "inspect", name]);
        match self.runner.run(&inspect, OutputMode::Captured, cancel).await {
            Ok(_) => {
                debug!(network = name, "network exists");
                return Ok(());
            }
            Err(e @ (DevinfraError::ToolMissing(_) | DevinfraError::Cancelled(_))) => {
                return Err(e)
            }
            Err(_) => {}
        }
        info!(network = name, "creating docker network");
        let create = ToolCommand::new("docker").args(["network", "create", name]);
        self.runner.run(&create, OutputMode::Captured, cancel).await?;
        Ok(())
    }
}

/// Group `docker ps` lines (`<labels>\t<name>`) by compose project.
/// Containers outside any compose project are skipped.
pub fn parse_running(stdout: &str) -> RunningMap {
    let mut running = RunningMap::new();
    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        let Some((labels, name)) = line.split_once('\t') else {
            continue;
        };
        let project = labels
            .split(',')
            .find_map(|label| label.strip_prefix(COMPOSE_PROJECT_LABEL));
        if let Some(project) = project {
            running
                .entry(project.to_string())
                .or_default()
                .push(name.trim().to_string());
        }
    }
    running
}
