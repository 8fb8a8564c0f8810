//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! alinear train configs/train_config.yaml -d data/full_label
//! alinear train configs/train_config.yaml --resume
//! alinear train configs/train_config.yaml -p ckpt/base.ckpt --ft
//! alinear validate configs/train_config.yaml --detailed
//! alinear info configs/train_config.yaml --format json
//! alinear init --output my_config.yaml
//! ```

mod core;
mod init;
mod types;

pub use core::{apply_overrides, parse_args, Cli, Command, InfoArgs, TrainArgs, ValidateArgs};
pub use init::InitArgs;
pub use types::OutputFormat;

#[cfg(test)]
mod tests;
