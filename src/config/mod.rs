//! Declarative training configuration
//!
//! Load a YAML document into an immutable [`TrainSpec`], validate it, and
//! parse the command line that drives a run.

mod cli;
mod loader;
pub mod schema;
pub mod template;
pub mod validate;


pub use cli::{
    apply_overrides, parse_args, Cli, Command, InfoArgs, InitArgs, OutputFormat, TrainArgs,
    ValidateArgs,
};
pub use loader::{global_config_path, load_config, load_run_config, merge_yaml, GLOBAL_CONFIG_FILE};
pub use schema::{
    ClipAlgorithm, Devices, GroupFreeze, GroupLr, LossFunctionSpec, LossSpec, LossTermsSpec,
    LrSchedulerKind, ModelSpec, OptimizerSpec, RampPolicyKind, RampUpSpec, TrainSpec,
    NUM_LABEL_REGIMES, NUM_LOSS_TERMS,
};
pub use template::{default_spec, render_template};
pub use validate::{validate_config, ValidationError};
