//! # Alinear: semi-supervised forced-alignment training
//!
//! Alinear drives the training of a phoneme-to-audio forced aligner from a
//! mix of fully labeled, weakly labeled and unlabeled recordings. The model
//! itself is a collaborator behind [`train::ModelExecutor`]; this crate owns
//! everything around it.
//!
//! ## Architecture
//!
//! - **config**: YAML run configuration, validation and the CLI surface
//! - **data**: example sources and the duration-binned, oversampling sampler
//! - **optim**: grouped AdamW, one-cycle schedules, clipping, the step controller
//! - **precision**: fp32/bf16/fp16 emulation and dynamic loss scaling
//! - **train**: ramp-up gating, the composite loss, checkpoints and the trainer
//!
//! ## Example
//!
//! ```no_run
//! use alinear::config::load_config;
//! use alinear::data::{open_source, Sampler, SamplerConfig, SyntheticConfig, TRAIN_MANIFEST};
//! use alinear::train::{FileCheckpointStore, LinearAligner, Trainer};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> alinear::Result<()> {
//! let spec = Arc::new(load_config("configs/train_config.yaml")?);
//! let source = open_source(Path::new("data"), TRAIN_MANIFEST, SyntheticConfig::default())?;
//! let sampler = Sampler::new(Arc::clone(&source), SamplerConfig::from_spec(&spec))?;
//! let model = LinearAligner::for_source(source.as_ref(), &spec);
//! let store = FileCheckpointStore::for_model(Path::new("ckpt"), &spec.model_name);
//!
//! let mut trainer = Trainer::new(spec, Box::new(model), Box::new(sampler), Box::new(store))?;
//! let result = trainer.train()?;
//! println!("finished at step {}", result.final_step);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod optim;
pub mod precision;
pub mod train;

pub use error::{Error, Result};
