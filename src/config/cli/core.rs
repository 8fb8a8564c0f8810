//! Core CLI types - Cli, Command, and argument structs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::init::InitArgs;
use super::types::OutputFormat;
use crate::config::TrainSpec;

/// Alinear: semi-supervised forced-alignment training
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "alinear")]
#[command(version)]
#[command(about = "Semi-supervised forced-alignment training orchestrator")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Train a model from a YAML configuration
    Train(TrainArgs),

    /// Validate a configuration file without training
    Validate(ValidateArgs),

    /// Display information about a configuration
    Info(InfoArgs),

    /// Write a starter configuration file
    Init(InitArgs),
}

/// Arguments for the train command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct TrainArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Data folder holding `train.jsonl`, `valid.jsonl` and `binary/global_config.yaml`
    #[arg(short, long, default_value = "data")]
    pub data_folder: PathBuf,

    /// Initialise weights from this checkpoint (step and optimizer state are not restored)
    #[arg(short, long)]
    pub pretrained: Option<PathBuf>,

    /// Resume from the newest checkpoint under `ckpt/<model_name>/`
    #[arg(short, long)]
    pub resume: bool,

    /// Fine-tune: no periodic checkpoints, write `ckpt/<model_name>.ckpt` at the end
    #[arg(long)]
    pub ft: bool,

    /// Checkpoint root directory
    #[arg(long, default_value = "ckpt")]
    pub ckpt_dir: PathBuf,

    /// Override total_steps
    #[arg(long)]
    pub total_steps: Option<u64>,

    /// Override random_seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override val_check_interval
    #[arg(long)]
    pub val_every: Option<u64>,

    /// Dry run (validate config but don't train)
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Show detailed validation report
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for the info command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InfoArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Output format (text, json, yaml)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to a TrainSpec
pub fn apply_overrides(spec: &mut TrainSpec, args: &TrainArgs) {
    if let Some(total_steps) = args.total_steps {
        spec.optimizer_config.total_steps = total_steps;
    }
    if let Some(seed) = args.seed {
        spec.random_seed = seed;
    }
    if let Some(val_every) = args.val_every {
        spec.val_check_interval = val_every;
    }
}
