//! Health checks.
//!
//! Independent probes run concurrently on a [`JoinSet`] and append to one
//! mutex-guarded list, so their order in the report is not stable. Registry
//! and per-project checks run afterwards, in registry order. Probes only
//! ever answer healthy or not; nothing here returns an error.

use crate::config::Config;
use crate::orchestrator;
use crate::paths;
use crate::process::{self, OutputMode, ToolCommand, ToolRunner};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Containers of the core stack that must be running.
pub const INFRA_CONTAINERS: &[&str] = &["traefik", "socket-proxy", "dnsmasq"];

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    /// Set only for failed checks.
    pub remediation: Option<String>,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, healthy: bool, remediation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: if healthy {
                CheckStatus::Ok
            } else {
                CheckStatus::Fail
            },
            remediation: (!healthy).then(|| remediation.into()),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Ok
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub passed: bool,
    pub checks: Vec<CheckResult>,
    /// Number of failed checks.
    pub errors: usize,
}

impl Report {
    pub fn from_checks(checks: Vec<CheckResult>) -> Self {
        let errors = checks.iter().filter(|c| !c.passed()).count();
        Self {
            passed: errors == 0,
            checks,
            errors,
        }
    }

    pub fn failed(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed())
    }
}

// ---------------------------------------------------------------------------
// Probes
// ---------------------------------------------------------------------------

/// The external observations the battery depends on.
pub trait Probes: Send + Sync + 'static {
    /// `docker info` succeeds.
    fn docker_daemon(&self, cancel: &CancellationToken) -> impl Future<Output = bool> + Send;

    fn tool_on_path(&self, tool: &str) -> bool;

    /// `mkcert -CAROOT` names an existing directory.
    fn mkcert_ca(&self, cancel: &CancellationToken) -> impl Future<Output = bool> + Send;

    fn network_exists(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = bool> + Send;

    fn container_running(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = bool> + Send;

    /// `test.test` resolves to loopback through the DNS proxy on `port`.
    fn dns_resolves(&self, port: u16, cancel: &CancellationToken)
        -> impl Future<Output = bool> + Send;

    /// OS-specific checks, already turned into results.
    fn platform(
        &self,
        dns_port: u16,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Vec<CheckResult>> + Send;
}

/// [`Probes`] against the real machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbes {
    runner: ToolRunner,
}

impl SystemProbes {
    async fn succeeds(&self, cmd: ToolCommand, cancel: &CancellationToken) -> bool {
        self.stdout(cmd, cancel).await.is_some()
    }

    async fn stdout(&self, cmd: ToolCommand, cancel: &CancellationToken) -> Option<String> {
        let cmd = cmd.timeout(PROBE_TIMEOUT);
        match self.runner.run(&cmd, OutputMode::Captured, cancel).await {
            Ok(out) => Some(out.stdout),
            Err(e) => {
                debug!(command = %cmd.display(), error = %e, "probe failed");
                None
            }
        }
    }
}

impl Probes for SystemProbes {
    async fn docker_daemon(&self, cancel: &CancellationToken) -> bool {
        self.succeeds(ToolCommand::new("docker").arg("info"), cancel)
            .await
    }

    fn tool_on_path(&self, tool: &str) -> bool {
        process::tool_exists(tool)
    }

    async fn mkcert_ca(&self, cancel: &CancellationToken) -> bool {
        match self
            .stdout(ToolCommand::new("mkcert").arg("-CAROOT"), cancel)
            .await
        {
            Some(out) => {
                let dir = out.trim();
                !dir.is_empty() && Path::new(dir).is_dir()
            }
            None => false,
        }
    }

    async fn network_exists(&self, name: &str, cancel: &CancellationToken) -> bool {
        self.succeeds(
            ToolCommand::new("docker").args(["network", "inspect", name]),
            cancel,
        )
        .await
    }

    async fn container_running(&self, name: &str, cancel: &CancellationToken) -> bool {
        orchestrator::container_running(&self.runner, name, cancel).await
    }

    async fn dns_resolves(&self, port: u16, cancel: &CancellationToken) -> bool {
        let cmd = ToolCommand::new("dig").args([
            "+short".to_string(),
            "test.test".to_string(),
            "@127.0.0.1".to_string(),
            "-p".to_string(),
            port.to_string(),
        ]);
        self.stdout(cmd, cancel)
            .await
            .is_some_and(|out| out.contains("127.0.0.1"))
    }

    async fn platform(&self, dns_port: u16, cancel: &CancellationToken) -> Vec<CheckResult> {
        platform_checks(self, dns_port, cancel).await
    }
}

#[cfg(target_os = "linux")]
async fn platform_checks(
    probes: &SystemProbes,
    _dns_port: u16,
    cancel: &CancellationToken,
) -> Vec<CheckResult> {
    let nss = probes
        .succeeds(
            ToolCommand::new("dpkg").args(["-s", "libnss3-tools"]),
            cancel,
        )
        .await;
    let resolved = probes
        .stdout(ToolCommand::new("resolvectl").arg("status"), cancel)
        .await
        .is_some_and(|out| out.contains(paths::TLD));
    let docker_group = probes
        .stdout(ToolCommand::new("id").arg("-nG"), cancel)
        .await
        .is_some_and(|out| out.split_whitespace().any(|g| g == "docker"));
    vec![
        CheckResult::new(
            "libnss3-tools",
            nss,
            "Install libnss3-tools: sudo apt install libnss3-tools",
        ),
        CheckResult::new(
            "systemd-resolved .test",
            resolved,
            "Configure systemd-resolved to forward .test to 127.0.0.1",
        ),
        CheckResult::new(
            "Docker group",
            docker_group,
            "Add yourself to the docker group: sudo usermod -aG docker $USER && newgrp docker",
        ),
    ]
}

#[cfg(target_os = "macos")]
async fn platform_checks(
    probes: &SystemProbes,
    dns_port: u16,
    _cancel: &CancellationToken,
) -> Vec<CheckResult> {
    const RESOLVER: &str = "/etc/resolver/test";
    let resolver = std::fs::read_to_string(RESOLVER).ok();
    let has = |needle: &str| resolver.as_deref().is_some_and(|text| text.contains(needle));
    vec![
        CheckResult::new(
            "Homebrew",
            probes.tool_on_path("brew"),
            "Install Homebrew: https://brew.sh",
        ),
        CheckResult::new(
            RESOLVER,
            resolver.is_some(),
            "Create /etc/resolver/test pointing at 127.0.0.1",
        ),
        CheckResult::new(
            "Resolver content",
            has("nameserver 127.0.0.1"),
            "Add 'nameserver 127.0.0.1' to /etc/resolver/test",
        ),
        CheckResult::new(
            "Resolver port",
            has(&format!("port {dns_port}")),
            format!("Set 'port {dns_port}' in /etc/resolver/test"),
        ),
    ]
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
async fn platform_checks(
    _probes: &SystemProbes,
    _dns_port: u16,
    _cancel: &CancellationToken,
) -> Vec<CheckResult> {
    Vec::new()
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

type Sink = Arc<Mutex<Vec<CheckResult>>>;

fn push(sink: &Sink, results: impl IntoIterator<Item = CheckResult>) {
    let mut guard = match sink.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard.extend(results);
}

fn spawn_check<F>(
    set: &mut JoinSet<()>,
    sink: &Sink,
    name: impl Into<String>,
    remediation: impl Into<String>,
    probe: F,
) where
    F: Future<Output = bool> + Send + 'static,
{
    let sink = Arc::clone(sink);
    let name = name.into();
    let remediation = remediation.into();
    set.spawn(async move {
        let healthy = probe.await;
        push(&sink, [CheckResult::new(name, healthy, remediation)]);
    });
}

/// Run the whole battery.
pub async fn run_all<P: Probes>(
    config: &Config,
    probes: Arc<P>,
    cancel: &CancellationToken,
) -> Report {
    let sink: Sink = Arc::new(Mutex::new(Vec::new()));
    let mut set = JoinSet::new();

    let (p, c) = (Arc::clone(&probes), cancel.clone());
    spawn_check(
        &mut set,
        &sink,
        "Docker",
        "Install Docker: https://docs.docker.com/get-docker/",
        async move { p.docker_daemon(&c).await },
    );

    let p = Arc::clone(&probes);
    spawn_check(
        &mut set,
        &sink,
        "mkcert",
        "Install mkcert: brew install mkcert (macOS) or apt install mkcert (Ubuntu)",
        async move { p.tool_on_path("mkcert") },
    );

    let (p, c) = (Arc::clone(&probes), cancel.clone());
    spawn_check(
        &mut set,
        &sink,
        "mkcert CA",
        "Run 'mkcert -install' to set up the local CA",
        async move { p.mkcert_ca(&c).await },
    );

    let (p, c) = (Arc::clone(&probes), cancel.clone());
    spawn_check(
        &mut set,
        &sink,
        "Docker network",
        format!(
            "Run 'devinfra init' or 'docker network create {}'",
            paths::PROXY_NETWORK
        ),
        async move { p.network_exists(paths::PROXY_NETWORK, &c).await },
    );

    for container in INFRA_CONTAINERS {
        let (p, c) = (Arc::clone(&probes), cancel.clone());
        spawn_check(
            &mut set,
            &sink,
            format!("{container} container"),
            "Run 'devinfra up' to start infrastructure",
            async move { p.container_running(container, &c).await },
        );
    }

    let infra_cert = config
        .certs_dir()
        .join(paths::cert_file_name(&paths::apex_domain(paths::INFRA_CERT_NAME)));
    spawn_check(
        &mut set,
        &sink,
        "Infra certs",
        "Run 'devinfra init' to generate infrastructure certs",
        async move { infra_cert.is_file() },
    );

    let (p, c, port) = (Arc::clone(&probes), cancel.clone(), config.dns_port);
    spawn_check(
        &mut set,
        &sink,
        "DNS resolution",
        "Run 'devinfra init' to configure DNS, then 'devinfra up' to start DNSMasq",
        async move { p.dns_resolves(port, &c).await },
    );

    let (p, c, s) = (Arc::clone(&probes), cancel.clone(), Arc::clone(&sink));
    set.spawn(async move {
        let results = p.platform(port, &c).await;
        push(&s, results);
    });

    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "health check task failed");
        }
    }

    let mut checks = {
        let mut guard = match sink.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(&mut *guard)
    };
    checks.extend(project_checks(config));
    Report::from_checks(checks)
}

/// Registry readability, then directory and certificate presence for every
/// registered project.
pub fn project_checks(config: &Config) -> Vec<CheckResult> {
    let registry = match Registry::load(&config.registry_path()) {
        Ok(registry) => registry,
        Err(e) => return vec![CheckResult::new("Registry", false, e.to_string())],
    };
    let mut checks = vec![CheckResult::new("Registry", true, "")];
    let certs_dir = config.certs_dir();
    for project in &registry.projects {
        checks.push(CheckResult::new(
            format!("{}: directory", project.name),
            project.dir.is_dir(),
            format!("Directory '{}' does not exist", project.dir.display()),
        ));
        let cert = certs_dir.join(paths::cert_file_name(&paths::apex_domain(&project.name)));
        checks.push(CheckResult::new(
            format!("{}: certs", project.name),
            cert.is_file(),
            format!("Run 'devinfra certs regen {}'", project.name),
        ));
    }
    checks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Project, Service};
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    struct FakeProbes {
        healthy: bool,
        platform: Vec<CheckResult>,
    }

    impl FakeProbes {
        fn all(healthy: bool) -> Arc<Self> {
            Arc::new(Self {
                healthy,
                platform: vec![CheckResult::new("Docker group", healthy, "join it")],
            })
        }
    }

    impl Probes for FakeProbes {
        async fn docker_daemon(&self, _c: &CancellationToken) -> bool {
            self.healthy
        }
        fn tool_on_path(&self, _tool: &str) -> bool {
            self.healthy
        }
        async fn mkcert_ca(&self, _c: &CancellationToken) -> bool {
            self.healthy
        }
        async fn network_exists(&self, _name: &str, _c: &CancellationToken) -> bool {
            self.healthy
        }
        async fn container_running(&self, _name: &str, _c: &CancellationToken) -> bool {
            self.healthy
        }
        async fn dns_resolves(&self, _port: u16, _c: &CancellationToken) -> bool {
            self.healthy
        }
        async fn platform(&self, _port: u16, _c: &CancellationToken) -> Vec<CheckResult> {
            self.platform.clone()
        }
    }

    fn healthy_config(tmp: &TempDir) -> Config {
        let config = Config::new(tmp.path().join("config"), 5354);
        config.ensure_dirs().unwrap();
        std::fs::write(config.certs_dir().join("traefik.test+1.pem"), "c").unwrap();
        config
    }

    fn names(report: &Report) -> BTreeSet<&str> {
        report.checks.iter().map(|c| c.name.as_str()).collect()
    }

    #[tokio::test]
    async fn all_healthy_passes() {
        let tmp = TempDir::new().unwrap();
        let config = healthy_config(&tmp);
        let report = run_all(&config, FakeProbes::all(true), &CancellationToken::new()).await;

        assert!(report.passed, "{report:?}");
        assert_eq!(report.errors, 0);
        let expected: BTreeSet<&str> = [
            "Docker",
            "mkcert",
            "mkcert CA",
            "Docker network",
            "traefik container",
            "socket-proxy container",
            "dnsmasq container",
            "Infra certs",
            "DNS resolution",
            "Docker group",
            "Registry",
        ]
        .into_iter()
        .collect();
        assert_eq!(names(&report), expected);
        assert!(report.checks.iter().all(|c| c.remediation.is_none()));
    }

    #[tokio::test]
    async fn missing_project_directory_names_the_path() {
        let tmp = TempDir::new().unwrap();
        let config = healthy_config(&tmp);
        let gone = tmp.path().join("gone");
        let mut registry = Registry::default();
        registry
            .add(Project::new("gone", &gone, false, vec![Service::new("web", 3000)]))
            .unwrap();
        registry.save(&config.registry_path()).unwrap();
        std::fs::write(config.certs_dir().join("gone.test+1.pem"), "c").unwrap();

        let report = run_all(&config, FakeProbes::all(true), &CancellationToken::new()).await;
        assert!(!report.passed);
        assert_eq!(report.errors, 1);
        let failed: Vec<_> = report.failed().collect();
        assert_eq!(failed[0].name, "gone: directory");
        let remediation = failed[0].remediation.as_deref().unwrap();
        assert!(remediation.contains(&gone.display().to_string()));
        // Sequential checks come after the concurrent batch, in order.
        let tail: Vec<_> = report.checks[report.checks.len() - 3..]
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(tail, vec!["Registry", "gone: directory", "gone: certs"]);
    }

    #[tokio::test]
    async fn failures_are_counted_with_remediation() {
        let tmp = TempDir::new().unwrap();
        let config = Config::new(tmp.path(), 5354);
        let report = run_all(&config, FakeProbes::all(false), &CancellationToken::new()).await;
        assert!(!report.passed);
        assert_eq!(report.errors, report.checks.len() - 1);
        assert!(report.failed().all(|c| c.remediation.is_some()));
    }

    #[test]
    fn corrupt_registry_fails_its_check() {
        let tmp = TempDir::new().unwrap();
        let config = Config::new(tmp.path(), 5354);
        std::fs::write(config.registry_path(), "projects: {{{").unwrap();
        let checks = project_checks(&config);
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].status, CheckStatus::Fail);
    }

    #[test]
    fn missing_cert_suggests_regen() {
        let tmp = TempDir::new().unwrap();
        let config = Config::new(tmp.path(), 5354);
        let mut registry = Registry::default();
        registry
            .add(Project::new("blog", tmp.path(), false, Vec::new()))
            .unwrap();
        registry.save(&config.registry_path()).unwrap();

        let checks = project_checks(&config);
        let certs = checks.iter().find(|c| c.name == "blog: certs").unwrap();
        assert_eq!(
            certs.remediation.as_deref(),
            Some("Run 'devinfra certs regen blog'")
        );
    }

    #[test]
    fn report_serializes_lowercase_status() {
        let report = Report::from_checks(vec![CheckResult::new("Docker", false, "install")]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["checks"][0]["status"], "fail");
        assert_eq!(json["errors"], 1);
        assert_eq!(json["passed"], false);
    }
}
