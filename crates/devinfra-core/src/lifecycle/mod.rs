//! Project lifecycle: create, import, add-flavor and remove.
//!
//! Create and import are transactions over side effects with no native
//! rollback (directories, rendered files, certificates, the registry file).
//! Each step that leaves something behind records a [`Compensation`] in a
//! [`Ledger`]; any failure unwinds the ledger newest-first and returns the
//! original error.

pub mod clean;
pub mod create;
pub mod flavor;
pub mod import;
pub mod init;
pub mod remove;
pub mod rollback;

pub use create::CreateRequest;
pub use import::ImportRequest;
pub use remove::RemoveOptions;
pub use rollback::{Compensation, Ledger};

use crate::canonical::canonicalize;
use crate::certs::CertIssuer;
use crate::config::Config;
use crate::error::{DevinfraError, Result};
use crate::io;
use crate::orchestrator::Orchestrator;
use crate::registry::{Registry, Service};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Directories a project may never live in (or under).
pub const SYSTEM_DIRS: &[&str] = &[
    "/etc", "/usr", "/bin", "/sbin", "/boot", "/proc", "/sys", "/dev",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Docker,
    Host,
}

impl Mode {
    pub fn is_host(self) -> bool {
        self == Mode::Host
    }
}

impl FromStr for Mode {
    type Err = DevinfraError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "docker" | "container" => Ok(Mode::Docker),
            "host" => Ok(Mode::Host),
            other => Err(DevinfraError::InvalidMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Mode::Docker => "docker",
            Mode::Host => "host",
        })
    }
}

/// The transaction engine, bound to one configuration and its collaborators.
pub struct Lifecycle<'a, C, O> {
    config: &'a Config,
    certs: &'a C,
    orchestrator: &'a O,
}

impl<'a, C: CertIssuer, O: Orchestrator> Lifecycle<'a, C, O> {
    pub fn new(config: &'a Config, certs: &'a C, orchestrator: &'a O) -> Self {
        Self {
            config,
            certs,
            orchestrator,
        }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    fn load_registry(&self) -> Result<Registry> {
        Registry::load(&self.config.registry_path())
    }

    /// Undo one recorded side effect.
    fn compensate(&self, step: &Compensation) -> Result<()> {
        match step {
            Compensation::RemoveDir(dir) => match std::fs::remove_dir_all(dir) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            },
            Compensation::ClearDir(dir) => clear_dir(dir),
            Compensation::RemoveFile(path) => io::remove_file_if_exists(path),
            Compensation::RevokeCerts(name) => self.certs.revoke(name),
            Compensation::Unregister(name) => {
                let path = self.config.registry_path();
                let mut registry = Registry::load(&path)?;
                if registry.get(name).is_some() {
                    registry.remove(name)?;
                    registry.save(&path)?;
                }
                Ok(())
            }
        }
    }

    /// Unwind `ledger` after `err` and hand `err` back unchanged.
    fn roll_back<T>(&self, ledger: Ledger, err: DevinfraError) -> Result<T> {
        warn!(error = %err, steps = ledger.steps().len(), "operation failed, rolling back");
        let failures = ledger.unwind(|step| self.compensate(step));
        if !failures.is_empty() {
            warn!(
                failed = failures.len(),
                "rollback incomplete; some artifacts may need manual cleanup"
            );
        }
        Err(err)
    }

    /// Cross-project port clash. Only two host-mode projects actually share
    /// host ports; anything else is a warning.
    fn check_ports(
        &self,
        registry: &Registry,
        services: &[Service],
        host_mode: bool,
    ) -> Result<()> {
        for svc in services {
            let owners: Vec<_> = registry
                .projects
                .iter()
                .filter(|p| p.services.iter().any(|s| s.port == svc.port))
                .collect();
            if let Some(owner) = owners.iter().find(|p| host_mode && p.host_mode) {
                return Err(DevinfraError::PortInUse {
                    port: svc.port,
                    project: owner.name.clone(),
                });
            }
            for owner in owners {
                warn!(
                    port = svc.port,
                    project = %owner.name,
                    "port is also used by another project"
                );
            }
        }
        Ok(())
    }
}

fn invalid_dir(dir: &Path, reason: &str) -> DevinfraError {
    DevinfraError::InvalidDirectory {
        path: dir.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Refuse relative paths, the filesystem root and system directories.
pub fn check_not_system_dir(dir: &Path) -> Result<()> {
    let invalid = |reason: &str| invalid_dir(dir, reason);
    if !dir.is_absolute() {
        return Err(invalid("must be an absolute path"));
    }
    let resolved = canonicalize(dir);
    if resolved == Path::new("/") {
        return Err(invalid("refusing to use the filesystem root"));
    }
    if SYSTEM_DIRS
        .iter()
        .any(|sys| resolved.starts_with(sys) || dir.starts_with(sys))
    {
        return Err(invalid("refusing to use a system directory"));
    }
    Ok(())
}

/// [`check_not_system_dir`], and anything that exists must be an empty
/// directory.
pub fn check_target_dir(dir: &Path) -> Result<()> {
    check_not_system_dir(dir)?;
    let invalid = |reason: &str| invalid_dir(dir, reason);
    if dir.exists() {
        if !dir.is_dir() {
            return Err(invalid("exists and is not a directory"));
        }
        if io::dir_has_entries(dir) {
            return Err(invalid("already exists and is not empty"));
        }
    }
    Ok(())
}

/// The compensation that returns the filesystem to its state before `dir`
/// is created: clear it if it already exists, otherwise remove the highest
/// ancestor that does not exist yet.
pub fn dir_compensation(dir: &Path) -> Compensation {
    if dir.exists() {
        return Compensation::ClearDir(dir.to_path_buf());
    }
    let top = dir
        .ancestors()
        .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
        .last()
        .unwrap_or(dir);
    Compensation::RemoveDir(top.to_path_buf())
}

/// Record the compensation for `dir`, then create it.
fn create_dir_tracked(dir: &Path, ledger: &mut Ledger) -> Result<()> {
    ledger.push(dir_compensation(dir));
    std::fs::create_dir_all(dir)?;
    Ok(())
}

fn clear_dir(dir: &Path) -> Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let path: PathBuf = entry?.path();
        if path.is_dir() && !path.is_symlink() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Test collaborators
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::orchestrator::RunningMap;
    use crate::paths;
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    /// Writes fake certificate files like mkcert would; optionally fails
    /// after writing them, or refuses to revoke them.
    pub struct FakeCerts {
        certs_dir: PathBuf,
        dynamic_dir: PathBuf,
        pub fail: bool,
        pub fail_revoke: bool,
        pub issued: Mutex<Vec<String>>,
        pub revoked: Mutex<Vec<String>>,
    }

    impl FakeCerts {
        pub fn new(config: &Config) -> Self {
            Self {
                certs_dir: config.certs_dir(),
                dynamic_dir: config.dynamic_dir(),
                fail: false,
                fail_revoke: false,
                issued: Mutex::new(Vec::new()),
                revoked: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(config: &Config) -> Self {
            Self {
                fail: true,
                ..Self::new(config)
            }
        }

        pub fn cert_path(&self, name: &str) -> PathBuf {
            self.certs_dir
                .join(paths::cert_file_name(&paths::apex_domain(name)))
        }
    }

    impl CertIssuer for FakeCerts {
        async fn issue(&self, name: &str, _cancel: &CancellationToken) -> Result<()> {
            std::fs::create_dir_all(&self.certs_dir)?;
            std::fs::write(self.cert_path(name), "cert")?;
            if self.fail {
                return Err(DevinfraError::ToolFailed {
                    command: "mkcert".into(),
                    output: "CA not installed".into(),
                });
            }
            std::fs::write(
                self.dynamic_dir.join(paths::tls_config_file_name(name)),
                "tls: {}\n",
            )?;
            self.issued.lock().unwrap().push(name.to_string());
            Ok(())
        }

        fn revoke(&self, name: &str) -> Result<()> {
            self.revoked.lock().unwrap().push(name.to_string());
            if self.fail_revoke {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "certs directory is read-only",
                )
                .into());
            }
            io::remove_file_if_exists(&self.cert_path(name))?;
            io::remove_file_if_exists(&self.dynamic_dir.join(paths::tls_config_file_name(name)))?;
            io::remove_file_if_exists(&self.dynamic_dir.join(paths::host_routes_file_name(name)))?;
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct FakeOrchestrator {
        pub fail_down: bool,
        pub downs: Mutex<Vec<PathBuf>>,
    }

    impl Orchestrator for FakeOrchestrator {
        async fn up(
            &self,
            _p: &str,
            _dir: &Path,
            _files: &[PathBuf],
            _c: &CancellationToken,
        ) -> Result<()> {
            Ok(())
        }

        async fn down(
            &self,
            _p: &str,
            dir: &Path,
            _files: &[PathBuf],
            _c: &CancellationToken,
        ) -> Result<()> {
            self.downs.lock().unwrap().push(dir.to_path_buf());
            if self.fail_down {
                return Err(DevinfraError::ToolMissing("docker".into()));
            }
            Ok(())
        }

        async fn logs(
            &self,
            _p: &str,
            _dir: &Path,
            _files: &[PathBuf],
            _c: &CancellationToken,
        ) -> Result<()> {
            Ok(())
        }

        async fn list_running(&self, _c: &CancellationToken) -> Result<RunningMap> {
            Ok(RunningMap::new())
        }

        async fn network_ensure(&self, _name: &str, _c: &CancellationToken) -> Result<()> {
            Ok(())
        }
    }

    /// Every file and directory under `root`, relative, sorted.
    pub fn snapshot(root: &Path) -> Vec<PathBuf> {
        fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                out.push(path.strip_prefix(root).unwrap().to_path_buf());
                if path.is_dir() {
                    walk(root, &path, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(root, root, &mut out);
        out.sort();
        out
    }
}
