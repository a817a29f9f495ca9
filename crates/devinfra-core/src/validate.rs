//! Pure validators for project names, ports, service lists and flavor sets.
//!
//! Every function here is side-effect free: callers may run them any number
//! of times before touching disk.

use crate::error::{DevinfraError, Result};
use crate::registry::Service;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

pub const MAX_NAME_LEN: usize = 63;

/// Names that would collide with infrastructure containers, the tool itself,
/// or generic words.
pub const RESERVED_NAMES: &[&str] = &[
    "traefik",
    "dnsmasq",
    "socket-proxy",
    "infra",
    "devinfra",
    "di",
    "test",
    "default",
    "all",
    "localhost",
];

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9-]*[a-z0-9]$|^[a-z]$").unwrap())
}

fn invalid_name(name: &str, reason: impl Into<String>) -> DevinfraError {
    DevinfraError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Check that `name` is a usable DNS label (RFC 1123) and not reserved.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid_name(name, "name is required"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid_name(
            name,
            "must be 63 characters or fewer (DNS label limit)",
        ));
    }
    if !name_re().is_match(name) {
        return Err(invalid_name(
            name,
            "must be lowercase alphanumeric with hyphens, start with a letter, not end with hyphen",
        ));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(invalid_name(name, "name is reserved"));
    }
    Ok(())
}

/// Check that `port` is in range and not one of the reserved ports.
pub fn validate_port(port: i64, reserved: &[u16]) -> Result<u16> {
    let invalid = |reason: String| DevinfraError::InvalidPort { port, reason };
    let Ok(p) = u16::try_from(port) else {
        return Err(invalid("must be between 1 and 65535".into()));
    };
    if p == 0 {
        return Err(invalid("must be between 1 and 65535".into()));
    }
    if reserved.contains(&p) {
        return Err(invalid("reserved by devinfra".into()));
    }
    Ok(p)
}

pub fn parse_port(s: &str, reserved: &[u16]) -> Result<u16> {
    let port: i64 = s
        .trim()
        .parse()
        .map_err(|_| DevinfraError::PortNotNumeric(s.to_string()))?;
    validate_port(port, reserved)
}

/// The single `web:3000` service a project gets when none are given.
pub fn default_services() -> Vec<Service> {
    vec![Service::new("web", 3000)]
}

/// Parse `web:3000,api:8080` into a validated service list. An empty string
/// yields [`default_services`].
pub fn parse_services(spec: &str, reserved: &[u16]) -> Result<Vec<Service>> {
    if spec.trim().is_empty() {
        return Ok(default_services());
    }
    let mut services = Vec::new();
    for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, port) = pair
            .split_once(':')
            .filter(|(n, p)| !n.is_empty() && !p.is_empty())
            .ok_or_else(|| DevinfraError::InvalidServiceSpec(pair.to_string()))?;
        services.push(Service::new(name, parse_port(port, reserved)?));
    }
    validate_services(&services, reserved)?;
    Ok(services)
}

/// Service names must be valid and unique; ports valid and unique within the project.
pub fn validate_services(services: &[Service], reserved: &[u16]) -> Result<()> {
    let mut names = HashSet::new();
    let mut ports = HashSet::new();
    for svc in services {
        validate_name(&svc.name)?;
        validate_port(i64::from(svc.port), reserved)?;
        if !names.insert(svc.name.as_str()) {
            return Err(DevinfraError::DuplicateServiceName(svc.name.clone()));
        }
        if !ports.insert(svc.port) {
            return Err(DevinfraError::DuplicatePort(svc.port));
        }
    }
    Ok(())
}

/// Flavors must be known, unique, and must not shadow a service name.
pub fn validate_flavors(
    project: &str,
    flavors: &[String],
    services: &[Service],
    available: &[String],
) -> Result<()> {
    let mut seen = HashSet::new();
    for flavor in flavors {
        if !available.contains(flavor) {
            return Err(DevinfraError::UnknownFlavor {
                flavor: flavor.clone(),
                available: available.join(", "),
            });
        }
        if !seen.insert(flavor.as_str()) {
            return Err(DevinfraError::FlavorExists {
                flavor: flavor.clone(),
                project: project.to_string(),
            });
        }
        if services.iter().any(|s| &s.name == flavor) {
            return Err(DevinfraError::FlavorShadowsService {
                flavor: flavor.clone(),
                project: project.to_string(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
