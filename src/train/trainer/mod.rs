//! Training orchestration
//!
//! The [`Trainer`] owns the run: it pulls batches from the sampler, runs
//! the model, evaluates the composite loss, hands gradients to the
//! optimization controller and decides when to validate and checkpoint.
//!
//! ```text
//! INIT -> RUNNING -> { VALIDATING, CHECKPOINTING } -> RUNNING -> ... -> DONE
//! ```
//!
//! `DONE` is reached when the step budget is used up or a stop was
//! requested; fatal errors leave the loop without touching checkpoints that
//! were already persisted.

mod core;
mod persist;
mod phase;
mod result;
mod step;
mod train_loop;


pub use self::core::{Trainer, TrainerOptions};
pub use phase::Phase;
pub use result::TrainResult;
pub use step::StepReport;
