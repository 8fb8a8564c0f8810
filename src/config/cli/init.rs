//! Init command types

use clap::Parser;
use std::path::PathBuf;

/// Arguments for the init command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InitArgs {
    /// Output path (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Model name written into the template
    #[arg(long, default_value = "aligner")]
    pub name: String,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,
}
