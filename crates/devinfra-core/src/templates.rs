//! Embedded project, flavor and infrastructure templates.
//!
//! Templates are compiled into the binary with `rust-embed` and rendered by
//! plain placeholder substitution (`{{project_name}}` and friends).

use crate::error::{DevinfraError, Result};
use crate::io;
use crate::paths;
use rand::Rng;
use rust_embed::RustEmbed;
use std::path::{Path, PathBuf};

#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/templates/"]
struct Assets;

const BASE_PREFIX: &str = "base/";
const FLAVOR_PREFIX: &str = "flavors/";
const INFRA_PREFIX: &str = "infra/";
const TEMPLATE_SUFFIX: &str = ".tpl";
const FLAVOR_SUFFIX: &str = ".yaml.tpl";

/// Length of generated service passwords, in hex characters.
pub const PASSWORD_LEN: usize = 24;

/// Values substituted into project and flavor templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateData {
    pub project_name: String,
    pub postgres_password: String,
    pub rabbitmq_password: String,
    pub minio_password: String,
}

impl TemplateData {
    /// Fresh data for `project` with newly generated passwords.
    pub fn new(project: &str) -> Self {
        Self {
            project_name: project.to_string(),
            postgres_password: random_password(PASSWORD_LEN),
            rabbitmq_password: random_password(PASSWORD_LEN),
            minio_password: random_password(PASSWORD_LEN),
        }
    }

    fn pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("{{project_name}}", &self.project_name),
            ("{{postgres_password}}", &self.postgres_password),
            ("{{rabbitmq_password}}", &self.rabbitmq_password),
            ("{{minio_password}}", &self.minio_password),
        ]
    }
}

/// `len` lowercase hex characters from the thread-local CSPRNG.
pub fn random_password(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
        .collect()
}

pub fn render(template: &str, data: &TemplateData) -> String {
    data.pairs()
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(key, value)
        })
}

fn asset_text(path: &str) -> Option<String> {
    Assets::get(path).map(|f| String::from_utf8_lossy(&f.data).into_owned())
}

// ---------------------------------------------------------------------------
// Flavors
// ---------------------------------------------------------------------------

/// Names of every embedded flavor, sorted.
pub fn available_flavors() -> Vec<String> {
    let mut flavors: Vec<String> = Assets::iter()
        .filter_map(|path| {
            path.strip_prefix(FLAVOR_PREFIX)
                .and_then(|rest| rest.strip_suffix(FLAVOR_SUFFIX))
                .map(str::to_string)
        })
        .collect();
    flavors.sort();
    flavors
}

/// Render `docker-compose.<flavor>.yaml` into `dir`.
pub fn render_flavor(dir: &Path, flavor: &str, data: &TemplateData) -> Result<PathBuf> {
    let template = asset_text(&format!("{FLAVOR_PREFIX}{flavor}{FLAVOR_SUFFIX}")).ok_or_else(
        || DevinfraError::UnknownFlavor {
            flavor: flavor.to_string(),
            available: available_flavors().join(", "),
        },
    )?;
    let target = dir.join(paths::flavor_file_name(flavor));
    io::atomic_write(&target, render(&template, data).as_bytes())?;
    Ok(target)
}

// ---------------------------------------------------------------------------
// Base project files
// ---------------------------------------------------------------------------

/// Render every `base/*.tpl` into `dir` with the `.tpl` suffix dropped.
/// Returns the written paths.
pub fn render_base(dir: &Path, data: &TemplateData) -> Result<Vec<PathBuf>> {
    let mut names: Vec<String> = Assets::iter()
        .filter_map(|path| {
            path.strip_prefix(BASE_PREFIX)
                .filter(|rest| rest.ends_with(TEMPLATE_SUFFIX))
                .map(str::to_string)
        })
        .collect();
    names.sort();

    let mut written = Vec::with_capacity(names.len());
    for name in names {
        let Some(template) = asset_text(&format!("{BASE_PREFIX}{name}")) else {
            continue;
        };
        let out_name = name.trim_end_matches(TEMPLATE_SUFFIX);
        let target = dir.join(out_name);
        io::atomic_write(&target, render(&template, data).as_bytes())?;
        written.push(target);
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// Infrastructure stack
// ---------------------------------------------------------------------------

/// Write the core stack files: compose file and dnsmasq config into
/// `compose_dir`, the dashboard TLS descriptor into `dynamic_dir`.
/// Existing files are replaced; these are managed content.
pub fn extract_infra(compose_dir: &Path, dynamic_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for path in Assets::iter() {
        let Some(name) = path.strip_prefix(INFRA_PREFIX) else {
            continue;
        };
        let dest_dir = if name == paths::INFRA_TLS_FILE {
            dynamic_dir
        } else {
            compose_dir
        };
        let Some(file) = Assets::get(&path) else {
            continue;
        };
        let target = dest_dir.join(name);
        io::atomic_write(&target, &file.data)?;
        written.push(target);
    }
    written.sort();
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn passwords_are_hex_and_sized() {
        let pw = random_password(PASSWORD_LEN);
        assert_eq!(pw.len(), 24);
        assert!(pw.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(pw, random_password(PASSWORD_LEN));
    }

    #[test]
    fn render_substitutes_every_placeholder() {
        let data = TemplateData::new("blog");
        let out = render(
            "{{project_name}} {{postgres_password}} {{rabbitmq_password}} {{minio_password}}",
            &data,
        );
        assert!(!out.contains("{{"));
        assert!(out.starts_with("blog "));
        assert!(out.contains(&data.postgres_password));
    }

    #[test]
    fn flavors_listed_sorted() {
        assert_eq!(
            available_flavors(),
            vec!["minio", "postgres", "rabbitmq", "redis"]
        );
    }

    #[test]
    fn render_flavor_writes_overlay() {
        let dir = TempDir::new().unwrap();
        let data = TemplateData::new("blog");
        let path = render_flavor(dir.path(), "postgres", &data).unwrap();
        assert_eq!(path, dir.path().join("docker-compose.postgres.yaml"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(&data.postgres_password));
        assert!(text.contains("blog-postgres-data"));
        let parsed: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
        assert!(parsed["services"]["postgres"].is_mapping());
    }

    #[test]
    fn unknown_flavor_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = render_flavor(dir.path(), "mongo", &TemplateData::new("blog")).unwrap_err();
        assert!(matches!(err, DevinfraError::UnknownFlavor { .. }));
        assert!(!io::dir_has_entries(dir.path()));
    }

    #[test]
    fn base_templates_render_without_suffix() {
        let dir = TempDir::new().unwrap();
        let written = render_base(dir.path(), &TemplateData::new("blog")).unwrap();
        assert!(written.contains(&dir.path().join("Makefile")));
        let makefile = std::fs::read_to_string(dir.path().join("Makefile")).unwrap();
        assert!(makefile.contains("-p blog"));
        assert!(!makefile.contains("{{"));
    }

    #[test]
    fn infra_files_split_between_compose_and_dynamic() {
        let dir = TempDir::new().unwrap();
        let compose = dir.path().join("compose");
        let dynamic = dir.path().join("dynamic");
        extract_infra(&compose, &dynamic).unwrap();
        assert!(compose.join("docker-compose.yaml").is_file());
        assert!(compose.join("dnsmasq.conf").is_file());
        assert!(dynamic.join("tls-infra.yaml").is_file());
        assert!(!compose.join("tls-infra.yaml").exists());
    }
}
