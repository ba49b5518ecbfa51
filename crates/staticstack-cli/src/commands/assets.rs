//! `staticstack assets`: List asset files with the job that uploads them.

use clap::Args;
use staticstack_compose::stack::ResourceGraph;

use super::GlobalArgs;
use crate::output::{format_bytes, heading};

/// Arguments for the `assets` command.
#[derive(Args, Debug)]
pub struct AssetsArgs {
    /// Only list files uploaded by this job.
    #[arg(long)]
    pub job: Option<String>,
}

/// Executes the `assets` command.
///
/// # Errors
///
/// Returns an error if composition fails or `--job` names no declared job.
pub fn execute(args: AssetsArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let graph = global.compose()?;
    for line in render(&graph, args.job.as_deref())? {
        println!("{line}");
    }
    Ok(())
}

fn render(graph: &ResourceGraph, job: Option<&str>) -> anyhow::Result<Vec<String>> {
    let plan = graph.deployment_plan();
    if let Some(name) = job {
        if !plan.iter().any(|p| p.construct_id == name) {
            let known: Vec<_> = plan.iter().map(|p| p.construct_id).collect();
            anyhow::bail!("unknown deployment job: {name} (declared: {})", known.join(", "));
        }
    }

    let mut rows: Vec<(&str, u64, &str, String)> = plan
        .iter()
        .filter(|p| job.is_none_or(|name| p.construct_id == name))
        .flat_map(|p| {
            p.files
                .iter()
                .map(move |f| (f.key.as_str(), f.size, p.construct_id, p.cache_control.to_string()))
        })
        .collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));

    let width = rows.iter().map(|r| r.0.len()).max().unwrap_or(0);
    let mut lines = Vec::with_capacity(rows.len() + 3);
    lines.extend(heading(&format!("Assets of: {}", graph.asset().source_path().display())));
    for (key, size, job_name, cache_control) in &rows {
        lines.push(format!(
            "  {key:<width$}  {:>10}  {job_name:<20}  {cache_control}",
            format_bytes(*size)
        ));
    }
    lines.push(format!("  {} file(s).", rows.len()));
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use staticstack_common::config::StackConfig;
    use staticstack_compose::stack::{App, InfraStack};

    use super::*;

    fn graph() -> (tempfile::TempDir, ResourceGraph) {
        let site = tempfile::tempdir().expect("site");
        fs::write(site.path().join("index.html"), "<html></html>").expect("write");
        fs::write(site.path().join("app.js"), "1").expect("write");
        fs::write(site.path().join("style.css"), "a{}").expect("write");
        let graph = InfraStack::compose(
            &App::new(),
            "Web",
            &StackConfig::with_asset_path(site.path()),
        )
        .expect("compose");
        (site, graph)
    }

    fn row<'a>(lines: &'a [String], key: &str) -> &'a str {
        lines
            .iter()
            .find(|l| l.trim_start().starts_with(key))
            .expect("row listed")
    }

    #[test]
    fn every_file_is_listed_with_its_job() {
        let (_site, graph) = graph();
        let lines = render(&graph, None).expect("render");
        assert!(row(&lines, "/index.html").contains("DeployWebsiteHtml"));
        assert!(row(&lines, "/index.html").ends_with("max-age=300"));
        assert!(row(&lines, "/app.js").contains("DeployWebsiteAssets"));
        assert!(row(&lines, "/style.css").ends_with("max-age=604800"));
        assert_eq!(lines.last().map(String::as_str), Some("  3 file(s)."));
    }

    #[test]
    fn job_filter_limits_rows() {
        let (_site, graph) = graph();
        let lines = render(&graph, Some("DeployWebsiteHtml")).expect("render");
        assert_eq!(lines.last().map(String::as_str), Some("  1 file(s)."));
    }

    #[test]
    fn unknown_job_is_an_error() {
        let (_site, graph) = graph();
        let err = render(&graph, Some("DeployEverything")).unwrap_err();
        assert!(err.to_string().contains("unknown deployment job"), "got: {err}");
    }
}
