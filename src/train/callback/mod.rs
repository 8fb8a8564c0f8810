//! Callback system for training events
//!
//! Hooks fired by the trainer:
//! - `on_train_begin` / `on_train_end`
//! - `on_step_end`
//! - `on_validation` (with the evaluator's metrics)
//! - `on_checkpoint` (after a checkpoint was persisted)
//!
//! # Example
//!
//! ```rust
//! use alinear::train::callback::{CallbackAction, CallbackContext, TrainerCallback};
//!
//! struct StopAt(u64);
//!
//! impl TrainerCallback for StopAt {
//!     fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
//!         if ctx.step >= self.0 {
//!             CallbackAction::Stop
//!         } else {
//!             CallbackAction::Continue
//!         }
//!     }
//! }
//! ```

mod manager;
mod progress;
mod traits;

pub use manager::CallbackManager;
pub use progress::ProgressCallback;
pub use traits::{CallbackAction, CallbackContext, TrainerCallback};
