use crate::config::Config;
use crate::error::{DevinfraError, Result};
use crate::io;
use crate::paths;
use crate::registry::Registry;
use crate::templates;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What the filesystem half of `init` did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InitOutcome {
    /// Infrastructure files written from the embedded templates.
    pub extracted: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported: Option<ImportSummary>,
    /// True when `.env` did not exist and was created.
    pub env_written: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Projects in the imported registry; `None` when the source had none.
    pub projects: Option<usize>,
    pub certs: usize,
    pub dynamic: usize,
}

/// Create the config tree, extract the infrastructure stack and, when asked,
/// copy state from an existing installation.
///
/// Network creation and infra certificates need the external tools and are
/// left to the caller.
pub fn prepare(config: &Config, import_from: Option<&Path>) -> Result<InitOutcome> {
    config.ensure_dirs()?;
    let extracted = templates::extract_infra(&config.compose_dir(), &config.dynamic_dir())?;
    info!(files = extracted.len(), "extracted infrastructure files");

    let imported = match import_from {
        Some(src) => Some(import_state(config, src)?),
        None => None,
    };

    let env = format!("DNS_PORT={}\n", config.dns_port);
    let env_written = io::write_if_missing(&config.env_file_path(), env.as_bytes())?;

    Ok(InitOutcome {
        extracted,
        imported,
        env_written,
    })
}

/// Copy `projects.yaml`, `certs/` and `dynamic/` from `src`. The registry is
/// parsed before anything is copied, so a corrupt source changes nothing.
fn import_state(config: &Config, src: &Path) -> Result<ImportSummary> {
    if !src.is_dir() {
        return Err(DevinfraError::InvalidDirectory {
            path: src.to_path_buf(),
            reason: "import source does not exist".into(),
        });
    }

    let src_registry = src.join(paths::REGISTRY_FILE);
    let registry = if src_registry.is_file() {
        Some(Registry::load(&src_registry)?)
    } else {
        None
    };

    let projects = match registry {
        Some(registry) => {
            registry.save(&config.registry_path())?;
            info!(projects = registry.projects.len(), "imported registry");
            Some(registry.projects.len())
        }
        None => None,
    };
    let certs = copy_files(&src.join(paths::CERTS_DIR), &config.certs_dir(), true)?;
    let dynamic = copy_files(&src.join(paths::DYNAMIC_DIR), &config.dynamic_dir(), false)?;
    Ok(ImportSummary {
        projects,
        certs,
        dynamic,
    })
}

/// Copy the regular files of `from` into `to`. Private files are made
/// owner-only on unix. A missing `from` copies nothing.
fn copy_files(from: &Path, to: &Path, private: bool) -> Result<usize> {
    let entries = match std::fs::read_dir(from) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };
    let mut copied = 0;
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().filter(|_| path.is_file()) else {
            continue;
        };
        let dest = to.join(name);
        debug!(from = %path.display(), to = %dest.display(), "copying");
        let data = std::fs::read(&path)?;
        io::atomic_write(&dest, &data)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if private {
                std::fs::set_permissions(&dest, std::fs::Permissions::from_mode(0o600))?;
            }
        }
        #[cfg(not(unix))]
        let _ = private;
        copied += 1;
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::{Project, Service};
    use tempfile::TempDir;

    #[test]
    fn fresh_init_extracts_stack_and_env() {
        let tmp = TempDir::new().unwrap();
        let config = Config::new(tmp.path().join("devinfra"), 6053);
        assert!(!config.is_initialized());

        let outcome = prepare(&config, None).unwrap();
        assert!(config.is_initialized());
        assert!(config.dnsmasq_conf().is_file());
        assert!(config.dynamic_dir().join(paths::INFRA_TLS_FILE).is_file());
        assert!(outcome.env_written);
        assert_eq!(
            std::fs::read_to_string(config.env_file_path()).unwrap(),
            "DNS_PORT=6053\n"
        );
        assert!(outcome.imported.is_none());
    }

    #[test]
    fn existing_env_is_kept() {
        let tmp = TempDir::new().unwrap();
        let config = Config::new(tmp.path(), 5354);
        config.ensure_dirs().unwrap();
        std::fs::write(config.env_file_path(), "DNS_PORT=9999\n").unwrap();

        let outcome = prepare(&config, None).unwrap();
        assert!(!outcome.env_written);
        assert_eq!(
            std::fs::read_to_string(config.env_file_path()).unwrap(),
            "DNS_PORT=9999\n"
        );
    }

    #[test]
    fn import_copies_registry_certs_and_routes() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("old");
        std::fs::create_dir_all(src.join("certs")).unwrap();
        std::fs::create_dir_all(src.join("dynamic")).unwrap();
        let mut registry = Registry::default();
        registry
            .add(Project::new(
                "blog",
                tmp.path().join("blog"),
                false,
                vec![Service::new("web", 3000)],
            ))
            .unwrap();
        registry.save(&src.join("projects.yaml")).unwrap();
        std::fs::write(src.join("certs/blog.test+1-key.pem"), "key").unwrap();
        std::fs::write(src.join("dynamic/tls-blog.yaml"), "tls").unwrap();

        let config = Config::new(tmp.path().join("new"), 5354);
        let outcome = prepare(&config, Some(&src)).unwrap();
        assert_eq!(
            outcome.imported,
            Some(ImportSummary {
                projects: Some(1),
                certs: 1,
                dynamic: 1,
            })
        );
        assert_eq!(Registry::load(&config.registry_path()).unwrap(), registry);
        assert!(config.tls_config_path("blog").is_file());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(config.certs_dir().join("blog.test+1-key.pem"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn corrupt_import_source_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("old");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("projects.yaml"), "projects: [oops").unwrap();

        let config = Config::new(tmp.path().join("new"), 5354);
        let err = prepare(&config, Some(&src)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptRegistry);
        assert!(!config.registry_path().exists());
    }
}
