//! `staticstack synth`: Render the stack template.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, ValueEnum};
use staticstack_compose::manifest::AssetManifest;
use staticstack_compose::stack::ResourceGraph;

use super::GlobalArgs;

/// Template serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Indented JSON.
    Json,
    /// YAML.
    Yaml,
}

/// Arguments for the `synth` command.
#[derive(Args, Debug)]
pub struct SynthArgs {
    /// Write the template, asset manifest, and staged assets to this directory
    /// instead of printing the template.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Template format.
    #[arg(long, value_enum, default_value_t = Format::Json)]
    pub format: Format,
}

/// Executes the `synth` command.
///
/// # Errors
///
/// Returns an error if composition, serialization, or writing fails.
pub fn execute(args: SynthArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let graph = global.compose()?;

    match args.out {
        Some(ref out) => {
            let written = write_outputs(&graph, out, args.format)?;
            for path in &written {
                println!("  wrote {}", path.display());
            }
        }
        None => print!("{}", render(&graph, args.format)?),
    }
    Ok(())
}

fn render(graph: &ResourceGraph, format: Format) -> anyhow::Result<String> {
    let rendered = match format {
        Format::Json => {
            let mut json = graph.template().to_json_pretty()?;
            json.push('\n');
            json
        }
        Format::Yaml => graph.template().to_yaml()?,
    };
    Ok(rendered)
}

/// Writes the template, the asset manifest, and the staged asset directory
/// into `out`, returning the paths written.
fn write_outputs(graph: &ResourceGraph, out: &Path, format: Format) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;

    let mut template_path = out.join(graph.template_file_name());
    if format == Format::Yaml {
        let _ = template_path.set_extension("yaml");
    }
    fs::write(&template_path, render(graph, format)?)
        .with_context(|| format!("writing {}", template_path.display()))?;

    let manifest_path = out.join(graph.assets_file_name());
    let manifest = AssetManifest::for_assets([graph.asset()]);
    fs::write(&manifest_path, manifest.to_json_pretty()?)
        .with_context(|| format!("writing {}", manifest_path.display()))?;

    let staged = graph.asset().stage_into(out)?;
    tracing::info!(
        out = %out.display(),
        template = %template_path.display(),
        "stack synthesized"
    );
    Ok(vec![template_path, manifest_path, staged])
}
