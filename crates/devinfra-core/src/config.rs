use crate::error::{DevinfraError, Result};
use crate::paths;
use std::path::{Path, PathBuf};

pub const DEFAULT_DNS_PORT: u16 = 5354;

/// Process-wide settings, resolved once at startup and passed by reference
/// to every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub config_dir: PathBuf,
    pub dns_port: u16,
}

impl Config {
    pub fn new(config_dir: impl Into<PathBuf>, dns_port: u16) -> Self {
        Self {
            config_dir: config_dir.into(),
            dns_port,
        }
    }

    /// Resolve the config directory.
    ///
    /// Priority:
    /// 1. `explicit` (`--config-dir` flag / `DEVINFRA_HOME`)
    /// 2. `$XDG_CONFIG_HOME/devinfra`
    /// 3. `~/.config/devinfra`
    pub fn resolve(
        explicit: Option<&Path>,
        xdg_config_home: Option<&Path>,
        dns_port: Option<u16>,
    ) -> Result<Self> {
        let dns_port = dns_port.unwrap_or(DEFAULT_DNS_PORT);
        if let Some(dir) = explicit {
            return Ok(Self::new(dir, dns_port));
        }
        if let Some(xdg) = xdg_config_home.filter(|p| p.is_absolute()) {
            return Ok(Self::new(xdg.join(paths::APP_DIR), dns_port));
        }
        let home = home::home_dir().ok_or(DevinfraError::HomeNotFound)?;
        Ok(Self::new(
            home.join(".config").join(paths::APP_DIR),
            dns_port,
        ))
    }

    // ---------------------------------------------------------------------------
    // Layout
    // ---------------------------------------------------------------------------

    pub fn compose_dir(&self) -> PathBuf {
        self.config_dir.join(paths::COMPOSE_DIR)
    }

    pub fn certs_dir(&self) -> PathBuf {
        self.config_dir.join(paths::CERTS_DIR)
    }

    pub fn dynamic_dir(&self) -> PathBuf {
        self.config_dir.join(paths::DYNAMIC_DIR)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.config_dir.join(paths::REGISTRY_FILE)
    }

    pub fn env_file_path(&self) -> PathBuf {
        self.config_dir.join(paths::ENV_FILE)
    }

    pub fn infra_compose_file(&self) -> PathBuf {
        self.compose_dir().join(paths::INFRA_COMPOSE_FILE)
    }

    pub fn dnsmasq_conf(&self) -> PathBuf {
        self.compose_dir().join(paths::DNSMASQ_CONF)
    }

    pub fn host_routes_path(&self, project: &str) -> PathBuf {
        self.dynamic_dir().join(paths::host_routes_file_name(project))
    }

    pub fn tls_config_path(&self, project: &str) -> PathBuf {
        self.dynamic_dir().join(paths::tls_config_file_name(project))
    }

    /// Ports no project service may claim: HTTP, HTTPS and the DNS proxy.
    pub fn reserved_ports(&self) -> [u16; 3] {
        [80, 443, self.dns_port]
    }

    pub fn is_initialized(&self) -> bool {
        self.infra_compose_file().is_file()
    }

    pub fn require_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(DevinfraError::NotInitialized)
        }
    }

    /// Create the config tree. Directories hold private keys, so they are
    /// owner-only on unix.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.config_dir.clone(),
            self.compose_dir(),
            self.certs_dir(),
            self.dynamic_dir(),
        ] {
            std::fs::create_dir_all(&dir)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))?;
            }
        }
        Ok(())
    }
}
