use super::{
    check_not_system_dir, check_target_dir, dir_compensation, Compensation, Ledger, Lifecycle,
};
use crate::artifacts;
use crate::certs::CertIssuer;
use crate::detect;
use crate::error::{DevinfraError, Result};
use crate::git::{self, ImportSource, RepoCloner};
use crate::io;
use crate::orchestrator::Orchestrator;
use crate::paths;
use crate::registry::{Project, Registry, Service};
use crate::validate;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Register an existing checkout, cloning it first when given a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    /// Git URL, or an absolute local path.
    pub source: ImportSource,
    /// Overrides the name derived from the URL or directory.
    pub name: Option<String>,
    /// Clone destination; defaults to `<clone_root>/<repo name>`.
    pub dir: Option<PathBuf>,
    pub clone_root: Option<PathBuf>,
    /// Services to route instead of those detected in the compose file.
    pub services: Option<Vec<Service>>,
}

/// Where the project lives and whether this call has to clone it.
struct Resolved {
    name: String,
    dir: PathBuf,
    clone_url: Option<String>,
}

impl<C: CertIssuer, O: Orchestrator> Lifecycle<'_, C, O> {
    pub async fn import<G: RepoCloner>(
        &self,
        req: &ImportRequest,
        cloner: &G,
        cancel: &CancellationToken,
    ) -> Result<Project> {
        let registry = self.load_registry()?;
        let resolved = self.precheck_import(req, &registry)?;
        self.config.ensure_dirs()?;

        let mut ledger = Ledger::new();
        match self
            .import_steps(req, &resolved, cloner, &mut ledger, cancel)
            .await
        {
            Ok(project) => {
                ledger.disarm();
                info!(project = %project.name, dir = %project.dir.display(), "project imported");
                Ok(project)
            }
            Err(e) => self.roll_back(ledger, e),
        }
    }

    fn precheck_import(&self, req: &ImportRequest, registry: &Registry) -> Result<Resolved> {
        let (derived, dir, clone_url) = match &req.source {
            ImportSource::GitUrl(url) => {
                git::validate_git_url(url)?;
                let derived = git::repo_name_from_url(url);
                let dir = match (&req.dir, &req.clone_root) {
                    (Some(dir), _) => dir.clone(),
                    (None, Some(root)) => root.join(&derived),
                    (None, None) => return Err(DevinfraError::HomeNotFound),
                };
                check_target_dir(&dir)?;
                (derived, dir, Some(url.clone()))
            }
            ImportSource::LocalPath(path) => {
                let dir = PathBuf::from(path);
                check_not_system_dir(&dir)?;
                if !dir.is_dir() {
                    return Err(DevinfraError::InvalidDirectory {
                        path: dir,
                        reason: "does not exist or is not a directory".into(),
                    });
                }
                let derived = dir
                    .file_name()
                    .map(|n| n.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                (derived, dir, None)
            }
        };

        let name = req.name.clone().unwrap_or(derived);
        validate::validate_name(&name)?;
        if registry.get(&name).is_some() {
            return Err(DevinfraError::ProjectExists(name));
        }
        if let Some(owner) = registry.has_directory(&dir) {
            return Err(DevinfraError::DirectoryRegistered {
                dir,
                project: owner.to_string(),
            });
        }
        if let Some(services) = &req.services {
            validate::validate_services(services, &self.config.reserved_ports())?;
        }
        Ok(Resolved {
            name,
            dir,
            clone_url,
        })
    }

    async fn import_steps<G: RepoCloner>(
        &self,
        req: &ImportRequest,
        resolved: &Resolved,
        cloner: &G,
        ledger: &mut Ledger,
        cancel: &CancellationToken,
    ) -> Result<Project> {
        let name = resolved.name.as_str();
        let dir = resolved.dir.as_path();

        if let Some(url) = &resolved.clone_url {
            ledger.push(dir_compensation(dir));
            cloner.clone_repo(url, dir, cancel).await?;
        }

        let compose_file = detect::find_compose_file(dir);
        let services = match (&req.services, compose_file) {
            (Some(explicit), _) => explicit.clone(),
            (None, Some(file)) => {
                info!(file, "found compose file");
                let detected = detect::parse_services(dir, file)?;
                detect::select_routable(detected, &self.config.reserved_ports())
            }
            (None, None) => Vec::new(),
        };
        validate::validate_services(&services, &self.config.reserved_ports())?;

        let registry = self.load_registry()?;
        self.check_ports(&registry, &services, false)?;

        if !services.is_empty() {
            match compose_file {
                Some(_) => {
                    let overlay = dir.join(paths::ROUTING_OVERLAY_FILE);
                    write_tracked(
                        &overlay,
                        &artifacts::routing_overlay(name, &services),
                        ledger,
                    )?;
                }
                None => {
                    let compose = dir.join(paths::PROJECT_COMPOSE_FILE);
                    write_tracked(
                        &compose,
                        &artifacts::container_compose(name, &services),
                        ledger,
                    )?;
                }
            }
            ledger.push(Compensation::RevokeCerts(name.to_string()));
            self.certs.issue(name, cancel).await?;
        } else {
            info!(project = name, "no routable services; registering only");
        }

        let mut project = Project::new(name, dir, false, services);
        project.compose_file = compose_file.map(str::to_string);

        let path = self.config.registry_path();
        let mut registry = Registry::load(&path)?;
        registry.add(project.clone())?;
        registry.save(&path)?;
        ledger.push(Compensation::Unregister(name.to_string()));
        Ok(project)
    }
}

/// Write `path`, recording its removal unless it was already there.
fn write_tracked(path: &Path, text: &str, ledger: &mut Ledger) -> Result<()> {
    if !path.exists() {
        ledger.push(Compensation::RemoveFile(path.to_path_buf()));
    }
    io::atomic_write(path, text.as_bytes())
}
