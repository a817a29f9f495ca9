use crate::canonical::canonicalize;
use crate::error::{DevinfraError, Result};
use crate::io::{self, StagedWrite};
use crate::paths;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub port: u16,
}

impl Service {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub dir: PathBuf,
    /// Display string (`*.<name>.test`); derived from `name`.
    pub domain: String,
    #[serde(default)]
    pub host_mode: bool,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flavors: Vec<String>,
    /// Pre-existing compose file of an imported project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compose_file: Option<String>,
    pub created_at: NaiveDate,
}

impl Project {
    pub fn new(
        name: impl Into<String>,
        dir: impl Into<PathBuf>,
        host_mode: bool,
        services: Vec<Service>,
    ) -> Self {
        let name = name.into();
        Self {
            domain: paths::wildcard_domain(&name),
            name,
            dir: dir.into(),
            host_mode,
            services,
            flavors: Vec::new(),
            compose_file: None,
            created_at: chrono::Local::now().date_naive(),
        }
    }

    pub fn mode(&self) -> &'static str {
        if self.host_mode {
            "host"
        } else {
            "docker"
        }
    }

    /// Compose files to pass to the orchestrator, base file first.
    pub fn compose_files(&self) -> Vec<PathBuf> {
        paths::project_compose_files(&self.dir, self.compose_file.as_deref(), &self.flavors)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Every registered project, in registration order.
///
/// Mutations only touch the in-memory snapshot; nothing is durable until
/// [`Registry::save`] succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl Registry {
    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    /// Read the registry file. A missing (or blank) file is an empty registry;
    /// anything unparsable is rejected rather than reset.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(DevinfraError::Persistence {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&data).map_err(|source| DevinfraError::CorruptRegistry {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Serialize and fsync to a temp file beside `path` without replacing it.
    pub fn stage(&self, path: &Path) -> Result<StagedWrite> {
        let data = serde_yaml::to_string(self)?;
        io::stage_write(path, data.as_bytes())
    }

    /// Replace the registry file wholesale (temp file, fsync, rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        self.stage(path)?.commit()
    }

    // ---------------------------------------------------------------------------
    // Queries and mutations
    // ---------------------------------------------------------------------------

    pub fn get(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.name == name)
    }

    pub fn require(&self, name: &str) -> Result<&Project> {
        self.get(name)
            .ok_or_else(|| DevinfraError::ProjectNotFound(name.to_string()))
    }

    pub fn add(&mut self, project: Project) -> Result<()> {
        if self.get(&project.name).is_some() {
            return Err(DevinfraError::ProjectExists(project.name));
        }
        self.projects.push(project);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<Project> {
        let idx = self
            .projects
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| DevinfraError::ProjectNotFound(name.to_string()))?;
        Ok(self.projects.remove(idx))
    }

    pub fn list(&self) -> Vec<String> {
        self.projects.iter().map(|p| p.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Name of the first project with a service on `port`.
    pub fn has_port(&self, port: u16) -> Option<&str> {
        self.projects
            .iter()
            .find(|p| p.services.iter().any(|s| s.port == port))
            .map(|p| p.name.as_str())
    }

    /// Name of the project registered at `dir`, compared by canonical path.
    pub fn has_directory(&self, dir: &Path) -> Option<&str> {
        let wanted = canonicalize(dir);
        self.projects
            .iter()
            .find(|p| canonicalize(&p.dir) == wanted)
            .map(|p| p.name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
