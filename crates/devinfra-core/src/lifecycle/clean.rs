use crate::config::Config;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Delete every certificate (`certs/*.pem`) and routing descriptor
/// (`dynamic/*.yaml`). The registry, the compose stack and project
/// directories are left alone. Returns the removed paths, sorted.
pub fn purge_generated(config: &Config) -> Result<Vec<PathBuf>> {
    let mut removed = remove_matching(&config.certs_dir(), "pem")?;
    removed.extend(remove_matching(&config.dynamic_dir(), "yaml")?);
    removed.sort();
    Ok(removed)
}

fn remove_matching(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut removed = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            debug!(path = %path.display(), "removing");
            std::fs::remove_file(&path)?;
            removed.push(path);
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn purge_keeps_registry_and_foreign_files() {
        let tmp = TempDir::new().unwrap();
        let config = Config::new(tmp.path(), 5354);
        config.ensure_dirs().unwrap();
        std::fs::write(config.registry_path(), "projects: []\n").unwrap();
        std::fs::write(config.certs_dir().join("blog.test+1.pem"), "c").unwrap();
        std::fs::write(config.certs_dir().join("blog.test+1-key.pem"), "k").unwrap();
        std::fs::write(config.certs_dir().join("notes.txt"), "n").unwrap();
        std::fs::write(config.tls_config_path("blog"), "tls").unwrap();
        std::fs::write(config.host_routes_path("blog"), "http").unwrap();

        let removed = purge_generated(&config).unwrap();
        assert_eq!(removed.len(), 4);
        assert!(config.registry_path().is_file());
        assert!(config.certs_dir().join("notes.txt").is_file());
        assert!(!config.tls_config_path("blog").exists());
        assert!(config.certs_dir().is_dir());
    }

    #[test]
    fn purge_on_fresh_config_is_a_noop() {
        let tmp = TempDir::new().unwrap();
        let config = Config::new(tmp.path().join("never-created"), 5354);
        assert!(purge_generated(&config).unwrap().is_empty());
    }
}
