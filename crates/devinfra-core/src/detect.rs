//! Discovery of an existing compose file and its published service ports.

use crate::error::Result;
use crate::registry::Service;
use serde_yaml::Value;
use std::path::Path;
use tracing::warn;

/// Compose file names in lookup priority order.
pub const COMPOSE_FILE_NAMES: &[&str] = &[
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedService {
    pub name: String,
    /// First container port the service publishes, if any.
    pub port: Option<u16>,
}

pub fn find_compose_file(dir: &Path) -> Option<&'static str> {
    COMPOSE_FILE_NAMES
        .iter()
        .copied()
        .find(|name| dir.join(name).is_file())
}

/// Services declared in `dir/<file>`, in file order.
pub fn parse_services(dir: &Path, file: &str) -> Result<Vec<DetectedService>> {
    let text = std::fs::read_to_string(dir.join(file))?;
    let doc: Value = serde_yaml::from_str(&text)?;
    let Some(services) = doc.get("services").and_then(Value::as_mapping) else {
        return Ok(Vec::new());
    };
    Ok(services
        .iter()
        .filter_map(|(name, def)| {
            let name = name.as_str()?.to_string();
            let port = def
                .get("ports")
                .and_then(Value::as_sequence)
                .and_then(|ports| ports.first())
                .and_then(first_port);
            Some(DetectedService { name, port })
        })
        .collect())
}

fn first_port(entry: &Value) -> Option<u16> {
    let port = match entry {
        Value::String(s) => parse_short_port(s),
        Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        Value::Mapping(_) => match entry.get("target")? {
            Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        },
        _ => None,
    };
    port.filter(|p| *p != 0)
}

/// Container port from short syntax: `8000`, `8080:8000`,
/// `127.0.0.1:8080:8000`, `8000/tcp`, `8000-8005`.
pub fn parse_short_port(spec: &str) -> Option<u16> {
    let spec = spec.split('/').next().unwrap_or(spec);
    let container = spec.rsplit(':').next().unwrap_or(spec);
    let first = container.split('-').next().unwrap_or(container);
    first.trim().parse().ok()
}

/// Services to route when nobody is asked: every service with a port that
/// is not reserved, ports-first then alphabetical.
pub fn select_routable(mut detected: Vec<DetectedService>, reserved: &[u16]) -> Vec<Service> {
    detected.sort_by(|a, b| {
        b.port
            .is_some()
            .cmp(&a.port.is_some())
            .then_with(|| a.name.cmp(&b.name))
    });
    detected
        .into_iter()
        .filter_map(|svc| {
            let port = svc.port?;
            if reserved.contains(&port) {
                warn!(service = %svc.name, port, "skipping service on reserved port");
                return None;
            }
            Some(Service::new(svc.name, port))
        })
        .collect()
}
