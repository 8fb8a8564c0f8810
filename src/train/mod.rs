//! Training orchestration
//!
//! - [`ramp`] - ramp-up gating of loss terms
//! - [`loss`] - the seven-term composite loss with GHM weighting
//! - [`model`] - model execution and evaluation seams
//! - [`checkpoint`] - checkpoint stores, retention and retries
//! - [`callback`] - training event hooks
//! - [`Trainer`] - the INIT / RUNNING / VALIDATING / CHECKPOINTING / DONE loop
//!
//! # Example
//!
//! ```no_run
//! use alinear::config::default_spec;
//! use alinear::data::{ExampleSource, Sampler, SamplerConfig, SyntheticConfig, SyntheticSource};
//! use alinear::train::{FileCheckpointStore, LinearAligner, Trainer};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let spec = Arc::new(default_spec());
//! let source: Arc<dyn ExampleSource> = Arc::new(SyntheticSource::new(SyntheticConfig::default()));
//! let model = LinearAligner::for_source(source.as_ref(), &spec);
//! let sampler = Sampler::new(source, SamplerConfig::from_spec(&spec)).unwrap();
//! let store = FileCheckpointStore::for_model(Path::new("ckpt"), &spec.model_name);
//!
//! let mut trainer = Trainer::new(spec, Box::new(model), Box::new(sampler), Box::new(store)).unwrap();
//! let result = trainer.train().unwrap();
//! println!("finished at step {}", result.final_step);
//! ```

pub mod callback;
pub mod checkpoint;
pub mod demo;
pub mod loss;
pub mod model;
pub mod ramp;
pub mod state;
pub mod stop;
mod trainer;

pub use callback::{CallbackAction, CallbackContext, CallbackManager, ProgressCallback, TrainerCallback};
pub use checkpoint::{
    checkpoint_file_name, load_weights, parse_checkpoint_step, save_weights, weights_path,
    CheckpointRing, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, RetryPolicy,
};
pub use demo::{LinearAligner, LossEvaluator};
pub use loss::{CompositeLoss, LossOutput, LossState, LossTerm, TermValue};
pub use model::{Evaluator, Metrics, ModelExecutor, Predictions, Targets};
pub use ramp::RampScheduler;
pub use state::{TrainingState, WeightsFile};
pub use stop::StopSignal;
pub use trainer::{Phase, StepReport, TrainResult, Trainer, TrainerOptions};
