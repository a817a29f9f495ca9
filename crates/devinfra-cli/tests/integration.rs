#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Run the binary against a throwaway config dir. PATH points at an empty
/// directory so docker and mkcert are never reached.
fn devinfra(tmp: &TempDir) -> Command {
    let bin_dir = tmp.path().join("bin");
    std::fs::create_dir_all(&bin_dir).unwrap();
    let mut cmd = Command::cargo_bin("devinfra").unwrap();
    cmd.current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env("PATH", &bin_dir)
        .env_remove("DEVINFRA_HOME")
        .env_remove("DNS_PORT")
        .env_remove("XDG_CONFIG_HOME")
        .arg("--config-dir")
        .arg(config_dir(tmp));
    cmd
}

fn config_dir(tmp: &TempDir) -> PathBuf {
    tmp.path().join("devinfra")
}

fn init(tmp: &TempDir) {
    devinfra(tmp).arg("init").assert().success();
}

// ---------------------------------------------------------------------------
// devinfra init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config_tree_without_external_tools() {
    let tmp = TempDir::new().unwrap();
    devinfra(&tmp)
        .arg("init")
        .assert()
        .success()
        .stderr(predicate::str::contains("Initialization complete!"))
        .stderr(predicate::str::contains("[WARN]"));

    let dir = config_dir(&tmp);
    assert!(dir.join("compose/docker-compose.yaml").is_file());
    assert!(dir.join("compose/dnsmasq.conf").is_file());
    assert!(dir.join("certs").is_dir());
    assert!(dir.join("dynamic/tls-infra.yaml").is_file());
    assert_eq!(
        std::fs::read_to_string(dir.join(".env")).unwrap(),
        "DNS_PORT=5354\n"
    );
}

#[test]
fn init_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    devinfra(&tmp)
        .arg("init")
        .assert()
        .success()
        .stderr(predicate::str::contains("Already initialized"));
}

#[test]
fn init_honours_dns_port() {
    let tmp = TempDir::new().unwrap();
    devinfra(&tmp)
        .args(["--dns-port", "6053", "init"])
        .assert()
        .success();
    let env = std::fs::read_to_string(config_dir(&tmp).join(".env")).unwrap();
    assert_eq!(env, "DNS_PORT=6053\n");
}

#[test]
fn init_rejects_corrupt_import_source() {
    let tmp = TempDir::new().unwrap();
    let old = tmp.path().join("old");
    std::fs::create_dir_all(&old).unwrap();
    std::fs::write(old.join("projects.yaml"), "projects: [oops").unwrap();

    devinfra(&tmp)
        .arg("init")
        .arg("--import-from")
        .arg(&old)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
    assert!(!config_dir(&tmp).join("projects.yaml").exists());
}

#[test]
fn init_imports_existing_registry() {
    let tmp = TempDir::new().unwrap();
    let old = tmp.path().join("old");
    std::fs::create_dir_all(&old).unwrap();
    std::fs::write(
        old.join("projects.yaml"),
        "projects:\n- name: blog\n  dir: /srv/blog\n  domain: '*.blog.test'\n  host_mode: false\n  services:\n  - name: web\n    port: 3000\n  created_at: 2025-01-01\n",
    )
    .unwrap();

    devinfra(&tmp)
        .arg("init")
        .arg("--import-from")
        .arg(&old)
        .assert()
        .success();
    devinfra(&tmp)
        .args(["list", "projects"])
        .assert()
        .success()
        .stdout("blog\n");

    let registry: serde_yaml::Value = serde_yaml::from_str(
        &std::fs::read_to_string(config_dir(&tmp).join("projects.yaml")).unwrap(),
    )
    .unwrap();
    assert_eq!(registry["projects"][0]["name"].as_str(), Some("blog"));
    assert_eq!(registry["projects"][0]["services"][0]["port"].as_u64(), Some(3000));
}

// ---------------------------------------------------------------------------
// Uninitialized guard
// ---------------------------------------------------------------------------

#[test]
fn commands_require_init() {
    let tmp = TempDir::new().unwrap();
    for args in [vec!["status"], vec!["up"], vec!["inspect", "blog"]] {
        devinfra(&tmp)
            .args(&args)
            .assert()
            .failure()
            .stderr(predicate::str::contains("not initialized"));
    }
}

#[test]
fn version_works_before_init() {
    let tmp = TempDir::new().unwrap();
    devinfra(&tmp)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("devinfra "));
}

#[test]
fn version_json_has_platform() {
    let tmp = TempDir::new().unwrap();
    let out = devinfra(&tmp)
        .args(["--json", "version"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["os"], std::env::consts::OS);
    assert!(value["version"].is_string());
}

// ---------------------------------------------------------------------------
// list / flavor
// ---------------------------------------------------------------------------

#[test]
fn list_flavors_includes_postgres_and_redis() {
    let tmp = TempDir::new().unwrap();
    devinfra(&tmp)
        .args(["list", "flavors"])
        .assert()
        .success()
        .stdout(predicate::str::contains("postgres"))
        .stdout(predicate::str::contains("redis"));
}

#[test]
fn flavor_list_matches_list_flavors() {
    let tmp = TempDir::new().unwrap();
    let a = devinfra(&tmp).args(["flavor", "list"]).output().unwrap();
    let b = devinfra(&tmp).args(["list", "flavors"]).output().unwrap();
    assert!(a.status.success());
    assert_eq!(a.stdout, b.stdout);
}

#[test]
fn list_projects_empty() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    devinfra(&tmp)
        .args(["list", "projects"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No projects registered."));
}

#[test]
fn flavor_add_unknown_project_fails() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    devinfra(&tmp)
        .args(["flavor", "add", "ghost", "redis"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));
}

// ---------------------------------------------------------------------------
// new / remove / status
// ---------------------------------------------------------------------------

#[test]
fn new_rejects_reserved_port_without_side_effects() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    let dir = tmp.path().join("blog");
    devinfra(&tmp)
        .args(["new", "--name", "blog", "--services", "web:80", "--dir"])
        .arg(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("reserved"));
    assert!(!dir.exists());
    assert!(!config_dir(&tmp).join("projects.yaml").exists());
}

#[test]
fn new_rejects_invalid_name() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    devinfra(&tmp)
        .args(["new", "--name", "Bad_Name", "--dir", "bad"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid name"));
    assert!(!tmp.path().join("bad").exists());
}

#[test]
fn new_rejects_unknown_mode() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    devinfra(&tmp)
        .args(["new", "--name", "blog", "--dir", "blog", "--mode", "vm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid mode"));
}

#[test]
fn remove_unknown_project_fails() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    devinfra(&tmp)
        .args(["remove", "ghost", "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn status_with_no_projects() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    devinfra(&tmp)
        .arg("status")
        .assert()
        .success()
        .stderr(predicate::str::contains("No projects"));
}

#[test]
fn status_json_with_no_projects() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    devinfra(&tmp)
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"projects\": []"));
}

#[test]
fn corrupt_registry_is_reported() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    std::fs::write(config_dir(&tmp).join("projects.yaml"), "projects: [oops").unwrap();
    devinfra(&tmp)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load project registry"));
}

#[test]
fn clean_force_removes_generated_files_only() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    let dir = config_dir(&tmp);
    std::fs::write(dir.join("projects.yaml"), "projects: []\n").unwrap();
    std::fs::write(dir.join("certs/blog.test+1.pem"), "cert").unwrap();

    devinfra(&tmp).args(["clean", "--force"]).assert().success();
    assert!(dir.join("projects.yaml").is_file());
    assert!(!dir.join("certs/blog.test+1.pem").exists());
    assert!(!dir.join("dynamic/tls-infra.yaml").exists());
}

#[test]
fn new_rolls_back_when_mkcert_is_missing() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);
    let dir = tmp.path().join("shop");
    devinfra(&tmp)
        .args(["new", "--name", "shop", "--flavors", "postgres", "--dir"])
        .arg(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("mkcert"));
    assert!(!dir.exists());
    assert!(!config_dir(&tmp).join("dynamic/tls-shop.yaml").exists());
    devinfra(&tmp)
        .args(["list", "projects"])
        .assert()
        .success()
        .stdout("");
}
