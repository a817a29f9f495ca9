//! Routing-config and compose-file text for a project's services.
//!
//! Every generator is a pure function of its arguments: the same name and
//! service list always produce byte-identical output. Nothing here touches
//! the filesystem; callers decide where the text lands.
//!
//! Routing rule: the first service answers on both the bare project domain
//! (`blog.test`) and its own subdomain (`web.blog.test`); every later
//! service only on its subdomain.

use crate::paths::{self, PROXY_NETWORK, TLD};
use crate::registry::Service;

/// Backing image for generated container-mode services.
pub const PLACEHOLDER_IMAGE: &str = "nginx:alpine";

/// Address traefik uses to reach services running on the host.
pub const HOST_GATEWAY: &str = "host.docker.internal";

fn router_name(project: &str, service: &str) -> String {
    format!("{project}-{service}")
}

/// Traefik `Host(...)` rule for the service at `index` in the project.
pub fn host_rule(project: &str, service: &str, index: usize) -> String {
    if index == 0 {
        format!("Host(`{project}.{TLD}`) || Host(`{service}.{project}.{TLD}`)")
    } else {
        format!("Host(`{service}.{project}.{TLD}`)")
    }
}

/// Public URLs in display order: the apex first, then one per service.
pub fn urls(project: &str, services: &[Service]) -> Vec<String> {
    if services.is_empty() {
        return Vec::new();
    }
    let mut urls = vec![format!("https://{}", paths::apex_domain(project))];
    urls.extend(
        services
            .iter()
            .map(|s| format!("https://{}.{}", s.name, paths::apex_domain(project))),
    );
    urls
}

fn push_traefik_labels(out: &mut String, project: &str, svc: &Service, index: usize) {
    let router = router_name(project, &svc.name);
    let rule = host_rule(project, &svc.name, index);
    out.push_str("    labels:\n");
    out.push_str("      - \"traefik.enable=true\"\n");
    out.push_str(&format!(
        "      - \"traefik.http.routers.{router}.rule={rule}\"\n"
    ));
    out.push_str(&format!(
        "      - \"traefik.http.routers.{router}.entrypoints=websecure\"\n"
    ));
    out.push_str(&format!(
        "      - \"traefik.http.routers.{router}.tls=true\"\n"
    ));
    out.push_str(&format!(
        "      - \"traefik.http.services.{router}.loadbalancer.server.port={}\"\n",
        svc.port
    ));
    out.push_str(&format!(
        "      - \"traefik.docker.network={PROXY_NETWORK}\"\n"
    ));
}

fn push_networks(out: &mut String) {
    out.push_str("    networks:\n");
    out.push_str("      - default\n");
    out.push_str(&format!("      - {PROXY_NETWORK}\n"));
}

// ---------------------------------------------------------------------------
// Container mode
// ---------------------------------------------------------------------------

/// `docker-compose.yaml` for a container-mode project: one placeholder
/// service per entry, labelled for traefik, on the project's own default
/// network plus the shared proxy network.
pub fn container_compose(project: &str, services: &[Service]) -> String {
    let mut out = String::from("services:\n");
    for (i, svc) in services.iter().enumerate() {
        out.push_str(&format!("  {}:\n", svc.name));
        out.push_str(&format!("    image: {PLACEHOLDER_IMAGE}\n"));
        push_networks(&mut out);
        push_traefik_labels(&mut out, project, svc, i);
        out.push('\n');
    }
    out.push_str("networks:\n");
    out.push_str(&format!("  {PROXY_NETWORK}:\n"));
    out.push_str("    external: true\n");
    out.push_str("  default:\n");
    out.push_str(&format!("    name: {project}\n"));
    out
}

/// `docker-compose.devinfra.yaml` overlay for an imported project: adds
/// routing labels and the proxy network to services the project's own
/// compose file already defines.
pub fn routing_overlay(project: &str, services: &[Service]) -> String {
    let mut out = String::from("services:\n");
    for (i, svc) in services.iter().enumerate() {
        out.push_str(&format!("  {}:\n", svc.name));
        push_networks(&mut out);
        push_traefik_labels(&mut out, project, svc, i);
        out.push('\n');
    }
    out.push_str("networks:\n");
    out.push_str(&format!("  {PROXY_NETWORK}:\n"));
    out.push_str("    external: true\n");
    out
}

// ---------------------------------------------------------------------------
// Host mode
// ---------------------------------------------------------------------------

/// Traefik file-provider config forwarding each service to the host.
pub fn host_routes(project: &str, services: &[Service]) -> String {
    let mut out = String::from("http:\n  routers:\n");
    for (i, svc) in services.iter().enumerate() {
        let router = router_name(project, &svc.name);
        out.push_str(&format!("    {router}:\n"));
        out.push_str(&format!(
            "      rule: \"{}\"\n",
            host_rule(project, &svc.name, i)
        ));
        out.push_str("      entryPoints:\n");
        out.push_str("        - websecure\n");
        out.push_str(&format!("      service: {router}\n"));
        out.push_str("      tls: {}\n");
    }
    out.push_str("\n  services:\n");
    for svc in services {
        let router = router_name(project, &svc.name);
        out.push_str(&format!("    {router}:\n"));
        out.push_str("      loadBalancer:\n");
        out.push_str("        servers:\n");
        out.push_str(&format!(
            "          - url: \"http://{HOST_GATEWAY}:{}\"\n",
            svc.port
        ));
    }
    out
}

/// Compose stub with no services, so the project network still exists.
pub fn network_stub(project: &str) -> String {
    format!("networks:\n  default:\n    name: {project}\n")
}

// ---------------------------------------------------------------------------
// TLS and docs
// ---------------------------------------------------------------------------

/// Traefik TLS descriptor pointing at the certificate pair for `domain`,
/// as mounted inside the traefik container.
pub fn tls_config(domain: &str) -> String {
    format!(
        "tls:\n  certificates:\n    - certFile: /certs/{}\n      keyFile: /certs/{}\n",
        paths::cert_file_name(domain),
        paths::key_file_name(domain)
    )
}

pub fn readme(project: &str, services: &[Service]) -> String {
    let mut out = format!("# {project}\n\n");
    out.push_str("## Quick Start\n\n```bash\n");
    out.push_str("make up      # Start project\n");
    out.push_str("make down    # Stop project\n");
    out.push_str("make logs    # Tail logs\n");
    out.push_str("make ps      # Show containers\n");
    out.push_str("```\n\n## URLs\n\n");
    for url in urls(project, services) {
        out.push_str(&format!("- {url}\n"));
    }
    out.push_str("\n## Infrastructure\n\n");
    out.push_str("Routing, TLS and DNS for this project are managed by devinfra.\n\n");
    out.push_str("```bash\n");
    out.push_str("devinfra up       # Start infrastructure\n");
    out.push_str("devinfra doctor   # Verify everything works\n");
    out.push_str("```\n");
    out
}
