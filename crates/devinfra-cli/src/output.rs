use crate::cmd::ProjectView;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_status(views: &[ProjectView]) {
    for line in status_lines(views) {
        println!("{line}");
    }
}

/// One row per project; a project's extra URLs continue on their own lines
/// under the URLS column. Projects without routing show `-`.
fn status_lines(views: &[ProjectView]) -> Vec<String> {
    let width = |header: &str, cell: fn(&ProjectView) -> &str| {
        views
            .iter()
            .map(|v| cell(v).len())
            .fold(header.len(), usize::max)
    };
    let name_w = width("NAME", |v| v.name.as_str());
    let mode_w = width("MODE", |v| v.mode);
    let status_w = width("STATUS", |v| v.status);
    let indent = name_w + mode_w + status_w + 6;

    let mut lines = vec![format!(
        "{:name_w$}  {:mode_w$}  {:status_w$}  URLS",
        "NAME", "MODE", "STATUS"
    )];
    for v in views {
        let mut urls = v.urls.iter();
        let first = urls.next().map_or("-", String::as_str);
        lines.push(format!(
            "{:name_w$}  {:mode_w$}  {:status_w$}  {first}",
            v.name, v.mode, v.status
        ));
        lines.extend(urls.map(|url| format!("{:indent$}{url}", "")));
    }
    lines
}
