//! CLI command definitions and dispatch.

pub mod assets;
pub mod plan;
pub mod synth;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use staticstack_common::config::StackConfig;
use staticstack_common::constants::DEFAULT_STACK_NAME;
use staticstack_compose::stack::{App, InfraStack, ResourceGraph};

/// Compose the infrastructure of a static site.
#[derive(Parser, Debug)]
#[command(name = "staticstack", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Directory of pre-built static assets. Overrides the config file.
    #[arg(long, global = true, env = "STATICSTACK_ASSET_PATH")]
    pub asset_path: Option<PathBuf>,

    /// Path to a JSON configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Name of the stack.
    #[arg(long, global = true, default_value = DEFAULT_STACK_NAME)]
    pub stack_name: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,
}

impl GlobalArgs {
    /// Builds the stack configuration: the config file if given, then the
    /// asset path flag on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded.
    pub fn stack_config(&self) -> anyhow::Result<StackConfig> {
        let mut config = match &self.config {
            Some(path) => StackConfig::load(path)?,
            None => StackConfig::default(),
        };
        if let Some(path) = &self.asset_path {
            config.asset_path = Some(path.clone());
        }
        Ok(config)
    }

    /// Composes the stack these options describe.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or composition fails.
    pub fn compose(&self) -> anyhow::Result<ResourceGraph> {
        let config = self.stack_config()?;
        Ok(InfraStack::compose(&App::new(), &self.stack_name, &config)?)
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render the template, or write it with the asset manifest and staged assets.
    Synth(synth::SynthArgs),
    /// Display resources in creation order and what each deployment job uploads.
    Plan(plan::PlanArgs),
    /// List every asset file with the job that uploads it.
    Assets(assets::AssetsArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Synth(args) => synth::execute(args, &cli.global),
        Command::Plan(args) => plan::execute(args, &cli.global),
        Command::Assets(args) => assets::execute(args, &cli.global),
    }
}
