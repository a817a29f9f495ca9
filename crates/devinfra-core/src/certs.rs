use crate::artifacts;
use crate::config::Config;
use crate::error::{DevinfraError, Result};
use crate::io;
use crate::paths;
use crate::process::{OutputMode, ToolCommand, ToolRunner};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Issues and revokes TLS material for a project's domain.
pub trait CertIssuer: Send + Sync {
    /// Produce `<name>.test` / `*.<name>.test` certificates and the traefik
    /// TLS descriptor that loads them.
    fn issue(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Best-effort removal of the project's certificates and routing
    /// descriptors. Files already gone are not errors.
    fn revoke(&self, name: &str) -> Result<()>;
}

/// [`CertIssuer`] backed by the `mkcert` binary.
#[derive(Debug, Clone)]
pub struct Mkcert {
    certs_dir: PathBuf,
    dynamic_dir: PathBuf,
    runner: ToolRunner,
}

impl Mkcert {
    pub fn new(config: &Config) -> Self {
        Self {
            certs_dir: config.certs_dir(),
            dynamic_dir: config.dynamic_dir(),
            runner: ToolRunner,
        }
    }

    /// Dashboard certificate for `traefik.test`.
    pub async fn issue_infra(&self, cancel: &CancellationToken) -> Result<()> {
        self.mkcert(paths::INFRA_CERT_NAME, cancel).await
    }

    async fn mkcert(&self, name: &str, cancel: &CancellationToken) -> Result<()> {
        create_private_dir(&self.certs_dir)?;
        let domain = paths::apex_domain(name);
        info!(%domain, "generating certificates");
        let cmd = ToolCommand::new("mkcert")
            .arg(&domain)
            .arg(paths::wildcard_domain(name))
            .current_dir(&self.certs_dir);
        self.runner.run(&cmd, OutputMode::Progress, cancel).await?;

        let key = self.certs_dir.join(paths::key_file_name(&domain));
        if let Err(e) = restrict_key(&key) {
            warn!(key = %key.display(), error = %e, "could not restrict key file permissions");
        }
        Ok(())
    }

    /// Write `dynamic/tls-<name>.yaml` for an issued certificate pair.
    pub fn write_tls_config(&self, name: &str) -> Result<PathBuf> {
        let path = self.dynamic_dir.join(paths::tls_config_file_name(name));
        io::atomic_write(
            &path,
            artifacts::tls_config(&paths::apex_domain(name)).as_bytes(),
        )?;
        Ok(path)
    }

    pub fn has_certs(&self, name: &str) -> bool {
        let domain = paths::apex_domain(name);
        self.certs_dir.join(paths::cert_file_name(&domain)).is_file()
    }
}

impl CertIssuer for Mkcert {
    async fn issue(&self, name: &str, cancel: &CancellationToken) -> Result<()> {
        self.mkcert(name, cancel).await?;
        self.write_tls_config(name)?;
        Ok(())
    }

    fn revoke(&self, name: &str) -> Result<()> {
        let prefix = paths::apex_domain(name);
        let mut targets: Vec<PathBuf> = match std::fs::read_dir(&self.certs_dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".pem"))
                })
                .collect(),
            Err(_) => Vec::new(),
        };
        targets.push(self.dynamic_dir.join(paths::tls_config_file_name(name)));
        targets.push(self.dynamic_dir.join(paths::host_routes_file_name(name)));

        let mut first_err: Option<DevinfraError> = None;
        for target in targets {
            if let Err(e) = io::remove_file_if_exists(&target) {
                warn!(path = %target.display(), error = %e, "failed to remove");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn create_private_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

fn restrict_key(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Config, Mkcert) {
        let dir = TempDir::new().unwrap();
        let cfg = Config::new(dir.path(), 5354);
        cfg.ensure_dirs().unwrap();
        let mkcert = Mkcert::new(&cfg);
        (dir, cfg, mkcert)
    }

    #[test]
    fn tls_config_written_to_dynamic_dir() {
        let (_dir, cfg, mkcert) = setup();
        let path = mkcert.write_tls_config("blog").unwrap();
        assert_eq!(path, cfg.tls_config_path("blog"));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("/certs/blog.test+1.pem"));
    }

    #[test]
    fn revoke_removes_only_the_projects_files() {
        let (_dir, cfg, mkcert) = setup();
        let certs = cfg.certs_dir();
        for f in [
            "blog.test+1.pem",
            "blog.test+1-key.pem",
            "blog-two.test+1.pem",
            "traefik.test+1.pem",
        ] {
            std::fs::write(certs.join(f), "x").unwrap();
        }
        mkcert.write_tls_config("blog").unwrap();
        std::fs::write(cfg.host_routes_path("blog"), "http: {}\n").unwrap();
        std::fs::write(cfg.tls_config_path("blog-two"), "tls: {}\n").unwrap();
        assert!(mkcert.has_certs("blog"));

        mkcert.revoke("blog").unwrap();

        assert!(!mkcert.has_certs("blog"));
        assert!(!certs.join("blog.test+1-key.pem").exists());
        assert!(!cfg.tls_config_path("blog").exists());
        assert!(!cfg.host_routes_path("blog").exists());
        assert!(certs.join("blog-two.test+1.pem").exists());
        assert!(certs.join("traefik.test+1.pem").exists());
        assert!(cfg.tls_config_path("blog-two").exists());
    }

    #[test]
    fn revoke_of_nothing_is_ok() {
        let (_dir, _cfg, mkcert) = setup();
        mkcert.revoke("ghost").unwrap();
    }
}
