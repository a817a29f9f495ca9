use super::Ctx;
use crate::output::print_json;
use serde::Serialize;

#[derive(Serialize)]
struct VersionInfo {
    version: &'static str,
    os: &'static str,
    arch: &'static str,
}

pub fn run(ctx: &Ctx) -> anyhow::Result<()> {
    let info = VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
    };
    if ctx.json {
        return print_json(&info);
    }
    println!("devinfra {} ({}/{})", info.version, info.os, info.arch);
    Ok(())
}
