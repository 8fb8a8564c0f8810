//! Core traits and types for the callback system
//!
//! - `CallbackContext` - snapshot of the run passed to callbacks
//! - `CallbackAction` - what a callback asks the trainer to do next
//! - `TrainerCallback` - the trait all callbacks implement

use crate::data::SamplerPosition;
use crate::train::model::Metrics;

/// Context passed to callbacks with the current training state
#[derive(Clone, Debug, Default)]
pub struct CallbackContext {
    /// Global step (steps consumed so far)
    pub step: u64,
    /// Step budget of the run
    pub total_steps: u64,
    /// Sampler cursor after the last batch
    pub position: SamplerPosition,
    /// Total loss of the last step, if it produced one
    pub loss: Option<f64>,
    /// Per-term weighted loss of the last step, by term name
    pub terms: Vec<(&'static str, f64)>,
    /// Learning rate per group (backbone, head)
    pub lr: [f32; 2],
    /// Gradient norm before clipping, when the step was applied
    pub grad_norm: Option<f32>,
    /// Whether the last step was dropped
    pub dropped: bool,
    /// Validation metrics (only set for `on_validation`)
    pub metrics: Option<Metrics>,
    /// Seconds since training started
    pub elapsed_secs: f64,
}

/// Action to take after a callback
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    /// Continue training normally
    Continue,
    /// Finish the current step, checkpoint and stop
    Stop,
}

/// Trait for training callbacks
///
/// All methods have default no-op implementations.
pub trait TrainerCallback: Send {
    fn on_train_begin(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn on_train_end(&mut self, _ctx: &CallbackContext) {}

    fn on_step_end(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn on_validation(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after the checkpoint for `ctx.step` was persisted
    fn on_checkpoint(&mut self, _ctx: &CallbackContext) {}

    fn name(&self) -> &'static str {
        "TrainerCallback"
    }
}
