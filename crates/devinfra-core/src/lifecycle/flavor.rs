use super::Lifecycle;
use crate::certs::CertIssuer;
use crate::error::{DevinfraError, Result};
use crate::io;
use crate::orchestrator::Orchestrator;
use crate::templates::{self, TemplateData};
use crate::validate;
use std::path::PathBuf;
use tracing::{info, warn};

impl<C: CertIssuer, O: Orchestrator> Lifecycle<'_, C, O> {
    /// Render one more flavor into an existing project and record it.
    ///
    /// The compose file is written first; if the registry cannot be saved
    /// afterwards it is deleted again.
    pub fn add_flavor(&self, project: &str, flavor: &str) -> Result<PathBuf> {
        let path = self.config.registry_path();
        let mut registry = self.load_registry()?;
        let entry = registry
            .get_mut(project)
            .ok_or_else(|| DevinfraError::ProjectNotFound(project.to_string()))?;

        let mut next = entry.flavors.clone();
        next.push(flavor.to_string());
        validate::validate_flavors(
            project,
            &next,
            &entry.services,
            &templates::available_flavors(),
        )?;

        let rendered = templates::render_flavor(&entry.dir, flavor, &TemplateData::new(project))?;
        entry.flavors = next;

        if let Err(e) = registry.save(&path) {
            if let Err(cleanup) = io::remove_file_if_exists(&rendered) {
                warn!(path = %rendered.display(), error = %cleanup, "could not remove flavor file");
            }
            return Err(e);
        }
        info!(project, flavor, "flavor added");
        Ok(rendered)
    }
}
