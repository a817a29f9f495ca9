use super::Ctx;
use crate::output::print_json;
use devinfra_core::doctor::{self, Report, SystemProbes};
use std::sync::Arc;

pub async fn run(ctx: &Ctx) -> anyhow::Result<()> {
    let report = doctor::run_all(&ctx.config, Arc::new(SystemProbes::default()), &ctx.cancel).await;

    if ctx.json {
        print_json(&report)?;
    } else {
        print_report(ctx, &report);
    }
    if !report.passed {
        anyhow::bail!("{} check(s) failed", report.errors);
    }
    Ok(())
}

fn print_report(ctx: &Ctx, report: &Report) {
    eprintln!();
    eprintln!("Dev-Infra Health Check");
    eprintln!("======================");
    eprintln!();
    for check in &report.checks {
        match (check.passed(), &check.remediation) {
            (true, _) => eprintln!("  {:<25}  OK", check.name),
            (false, Some(fix)) => eprintln!("  {:<25}  FAIL → {fix}", check.name),
            (false, None) => eprintln!("  {:<25}  FAIL", check.name),
        }
    }
    eprintln!();
    if report.passed {
        ctx.ui.ok("All checks passed!");
    } else {
        ctx.ui.fail(format!(
            "{} check(s) failed. See remediation steps above.",
            report.errors
        ));
    }
}
