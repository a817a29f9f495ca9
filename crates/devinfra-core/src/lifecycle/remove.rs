use super::Lifecycle;
use crate::certs::CertIssuer;
use crate::error::{DevinfraError, Result};
use crate::io;
use crate::orchestrator::Orchestrator;
use crate::paths;
use crate::registry::Project;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Also delete the project directory. Never implied.
    pub delete_dir: bool,
}

impl<C: CertIssuer, O: Orchestrator> Lifecycle<'_, C, O> {
    /// Unregister a project.
    ///
    /// Stopping containers and revoking certificates are best effort. The
    /// registry write is fatal. Directory deletion, when asked for, runs
    /// last so a failure there never leaves a registry entry behind.
    pub async fn remove(
        &self,
        name: &str,
        opts: RemoveOptions,
        cancel: &CancellationToken,
    ) -> Result<Project> {
        let path = self.config.registry_path();
        let mut registry = self.load_registry()?;
        let project = registry.require(name)?.clone();

        let files = project.compose_files();
        if files.first().is_some_and(|f| f.is_file()) {
            info!(project = name, "stopping containers");
            if let Err(e) = self.orchestrator.down(name, &project.dir, &files, cancel).await {
                warn!(project = name, error = %e, "could not stop containers");
            }
        }

        if let Err(e) = self.certs.revoke(name) {
            warn!(project = name, error = %e, "could not remove certificates");
        }

        if project.compose_file.is_some() {
            let overlay = project.dir.join(paths::ROUTING_OVERLAY_FILE);
            if let Err(e) = io::remove_file_if_exists(&overlay) {
                warn!(path = %overlay.display(), error = %e, "could not remove routing overlay");
            }
        }

        registry.remove(name)?;
        registry.save(&path)?;
        info!(project = name, "unregistered");

        if opts.delete_dir {
            info!(dir = %project.dir.display(), "deleting project directory");
            match std::fs::remove_dir_all(&project.dir) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(DevinfraError::Persistence {
                        path: project.dir.clone(),
                        source,
                    })
                }
            }
        }
        Ok(project)
    }
}
