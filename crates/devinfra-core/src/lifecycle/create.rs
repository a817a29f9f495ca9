use super::{check_target_dir, create_dir_tracked, Compensation, Ledger, Lifecycle, Mode};
use crate::artifacts;
use crate::certs::CertIssuer;
use crate::error::{DevinfraError, Result};
use crate::io;
use crate::orchestrator::Orchestrator;
use crate::paths;
use crate::registry::{Project, Registry, Service};
use crate::templates::{self, TemplateData};
use crate::validate;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A fully specified new project. `dir` must already be absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub name: String,
    pub dir: PathBuf,
    pub mode: Mode,
    /// Empty means the default `web:3000`.
    pub services: Vec<Service>,
    pub flavors: Vec<String>,
}

impl<C: CertIssuer, O: Orchestrator> Lifecycle<'_, C, O> {
    /// Create a project: directory, rendered files, routing, certificates,
    /// registry entry. Either every step lands or the filesystem and the
    /// registry are returned to their state before the call.
    pub async fn create(&self, req: &CreateRequest, cancel: &CancellationToken) -> Result<Project> {
        let registry = self.load_registry()?;
        let project = self.precheck_create(req, &registry)?;
        self.config.ensure_dirs()?;

        let mut ledger = Ledger::new();
        match self.create_steps(&project, &mut ledger, cancel).await {
            Ok(()) => {
                ledger.disarm();
                info!(project = %project.name, dir = %project.dir.display(), "project created");
                Ok(project)
            }
            Err(e) => self.roll_back(ledger, e),
        }
    }

    /// Every check that can fail without touching disk.
    fn precheck_create(&self, req: &CreateRequest, registry: &Registry) -> Result<Project> {
        let reserved = self.config.reserved_ports();
        validate::validate_name(&req.name)?;

        let services = if req.services.is_empty() {
            validate::default_services()
        } else {
            req.services.clone()
        };
        validate::validate_services(&services, &reserved)?;
        validate::validate_flavors(
            &req.name,
            &req.flavors,
            &services,
            &templates::available_flavors(),
        )?;

        if registry.get(&req.name).is_some() {
            return Err(DevinfraError::ProjectExists(req.name.clone()));
        }
        if let Some(owner) = registry.has_directory(&req.dir) {
            return Err(DevinfraError::DirectoryRegistered {
                dir: req.dir.clone(),
                project: owner.to_string(),
            });
        }
        check_target_dir(&req.dir)?;
        self.check_ports(registry, &services, req.mode.is_host())?;

        let mut project = Project::new(&req.name, &req.dir, req.mode.is_host(), services);
        project.flavors = req.flavors.clone();
        Ok(project)
    }

    async fn create_steps(
        &self,
        project: &Project,
        ledger: &mut Ledger,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let name = project.name.as_str();
        let dir = project.dir.as_path();

        info!(dir = %dir.display(), "creating project directory");
        create_dir_tracked(dir, ledger)?;

        let data = TemplateData::new(name);
        templates::render_base(dir, &data)?;

        let compose_path = dir.join(paths::PROJECT_COMPOSE_FILE);
        if project.host_mode {
            let routes = self.config.host_routes_path(name);
            ledger.push(Compensation::RemoveFile(routes.clone()));
            io::atomic_write(&routes, artifacts::host_routes(name, &project.services).as_bytes())?;
            io::atomic_write(&compose_path, artifacts::network_stub(name).as_bytes())?;
        } else {
            io::atomic_write(
                &compose_path,
                artifacts::container_compose(name, &project.services).as_bytes(),
            )?;
        }

        let readme = dir.join(paths::README_FILE);
        let readme_text = artifacts::readme(name, &project.services);
        if let Err(e) = io::atomic_write(&readme, readme_text.as_bytes()) {
            warn!(error = %e, "could not write README");
        }

        for flavor in &project.flavors {
            info!(flavor = %flavor, "adding flavor");
            templates::render_flavor(dir, flavor, &data)?;
        }

        // Recorded before issuing so a half-finished issuance is cleaned too.
        ledger.push(Compensation::RevokeCerts(name.to_string()));
        self.certs.issue(name, cancel).await?;

        let path = self.config.registry_path();
        let mut registry = Registry::load(&path)?;
        registry.add(project.clone())?;
        registry.save(&path)?;
        ledger.push(Compensation::Unregister(name.to_string()));
        Ok(())
    }
}
