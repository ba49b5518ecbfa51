//! `staticstack plan`: Display the resources and uploads a deploy would perform.

use clap::Args;
use staticstack_compose::graph::DependencyGraph;
use staticstack_compose::stack::ResourceGraph;

use super::GlobalArgs;
use crate::output::{format_bytes, heading};

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Also list the files each deployment job uploads.
    #[arg(long)]
    pub files: bool,
}

/// Executes the `plan` command.
///
/// Composes the stack, resolves the creation order of its resources, and
/// displays it together with the deployment jobs.
///
/// # Errors
///
/// Returns an error if composition or graph resolution fails.
pub fn execute(args: PlanArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let graph = global.compose()?;
    for line in render(&graph, args.files)? {
        println!("{line}");
    }
    Ok(())
}

fn render(graph: &ResourceGraph, with_files: bool) -> anyhow::Result<Vec<String>> {
    let template = graph.template();
    let order = DependencyGraph::from_template(template)?.resolve_order()?;

    let mut lines = Vec::new();
    lines.extend(heading(&format!("Deployment Plan for: {}", graph.stack_name())));
    lines.push(String::new());

    for id in &order {
        if let Some(resource) = template.resource(id) {
            lines.push(format!("  + {id}"));
            lines.push(format!("      type: {}", resource.resource_type));
        }
    }
    lines.push(String::new());
    lines.push(format!("  {} resource(s) will be created.", order.len()));

    lines.push(String::new());
    lines.push(format!(
        "  Asset: {} ({} file(s), {})",
        graph.asset().source_path().display(),
        graph.asset().files().len(),
        format_bytes(graph.asset().total_bytes())
    ));
    lines.push(format!("      hash: {}", graph.asset().hash()));

    lines.push(String::new());
    lines.push("  Deployment jobs:".to_owned());
    for job in graph.deployment_plan() {
        lines.push(format!("    {} ({})", job.construct_id, job.logical_id));
        lines.push(format!(
            "      files: {} ({})",
            job.files.len(),
            format_bytes(job.total_bytes())
        ));
        lines.push(format!("      cache-control: {}", job.cache_control));
        if job.invalidation_paths.is_empty() {
            lines.push("      invalidates: nothing".to_owned());
        } else {
            lines.push(format!("      invalidates: {}", job.invalidation_paths.join(", ")));
        }
        if with_files {
            for file in &job.files {
                lines.push(format!("        {}", file.key));
            }
        }
    }

    lines.push(String::new());
    lines.push("  Outputs:".to_owned());
    for (id, output) in &template.outputs {
        match &output.description {
            Some(description) => lines.push(format!("    {id}: {description}")),
            None => lines.push(format!("    {id}")),
        }
    }

    Ok(lines)
}
