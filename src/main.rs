//! Alinear CLI
//!
//! Single-command training entry point for the alinear library.
//!
//! # Usage
//!
//! ```bash
//! # Train from config
//! alinear train configs/train_config.yaml -d data/full_label
//!
//! # Resume the newest checkpoint under ckpt/<model_name>/
//! alinear train configs/train_config.yaml --resume
//!
//! # Fine-tune from pretrained weights
//! alinear train configs/train_config.yaml -p ckpt/base.ckpt --ft
//!
//! # Validate config
//! alinear validate configs/train_config.yaml --detailed
//!
//! # Show config info
//! alinear info configs/train_config.yaml --format json
//!
//! # Write a starter config
//! alinear init --output configs/train_config.yaml
//! ```

use alinear::cli::{run_command, Cli};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
