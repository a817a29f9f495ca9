use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Layout constants (relative to the config directory)
// ---------------------------------------------------------------------------

pub const APP_DIR: &str = "devinfra";
pub const COMPOSE_DIR: &str = "compose";
pub const CERTS_DIR: &str = "certs";
pub const DYNAMIC_DIR: &str = "dynamic";

pub const REGISTRY_FILE: &str = "projects.yaml";
pub const ENV_FILE: &str = ".env";
pub const INFRA_COMPOSE_FILE: &str = "docker-compose.yaml";
pub const DNSMASQ_CONF: &str = "dnsmasq.conf";
pub const INFRA_TLS_FILE: &str = "tls-infra.yaml";

/// Top-level domain every project is served under.
pub const TLD: &str = "test";

/// Compose project name used for the core infrastructure stack.
pub const INFRA_PROJECT: &str = "devinfra";

/// Shared docker network joined by traefik and every routed project.
pub const PROXY_NETWORK: &str = "traefik";

/// The dashboard certificate is issued for `traefik.test`.
pub const INFRA_CERT_NAME: &str = "traefik";

/// Compose file generated inside a project directory.
pub const PROJECT_COMPOSE_FILE: &str = "docker-compose.yaml";

/// Routing overlay generated for imported projects that bring their own compose file.
pub const ROUTING_OVERLAY_FILE: &str = "docker-compose.devinfra.yaml";

pub const README_FILE: &str = "README.md";

// ---------------------------------------------------------------------------
// Per-project file names
// ---------------------------------------------------------------------------

pub fn flavor_file_name(flavor: &str) -> String {
    format!("docker-compose.{flavor}.yaml")
}

pub fn host_routes_file_name(project: &str) -> String {
    format!("host-{project}.yaml")
}

pub fn tls_config_file_name(project: &str) -> String {
    format!("tls-{project}.yaml")
}

/// `blog` -> `blog.test`
pub fn apex_domain(project: &str) -> String {
    format!("{project}.{TLD}")
}

/// `blog` -> `*.blog.test`
pub fn wildcard_domain(project: &str) -> String {
    format!("*.{project}.{TLD}")
}

/// Certificate file written by mkcert for a two-name request.
pub fn cert_file_name(domain: &str) -> String {
    format!("{domain}+1.pem")
}

pub fn key_file_name(domain: &str) -> String {
    format!("{domain}+1-key.pem")
}

/// Ordered compose files for a project directory: the base file, the routing
/// overlay when it exists on disk, then one file per flavor.
pub fn project_compose_files(
    dir: &Path,
    compose_file: Option<&str>,
    flavors: &[String],
) -> Vec<PathBuf> {
    let mut files = vec![dir.join(compose_file.unwrap_or(PROJECT_COMPOSE_FILE))];
    let overlay = dir.join(ROUTING_OVERLAY_FILE);
    if overlay.exists() {
        files.push(overlay);
    }
    for flavor in flavors {
        files.push(dir.join(flavor_file_name(flavor)));
    }
    files
}
