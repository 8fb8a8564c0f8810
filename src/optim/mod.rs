//! Parameter groups, AdamW, clipping, schedules and the optimization controller

mod adamw;
mod clip;
pub mod controller;
mod param;
pub mod scheduler;

pub use adamw::{AdamW, AdamWState};
pub use clip::{clip_grad_norm, clip_grad_value, global_norm};
pub use controller::{ControllerConfig, OptimizationController, OptimizerSnapshot, StepOutcome};
pub use param::{Gradients, GroupKind, Param};
pub use scheduler::{build_scheduler, ConstantLR, LRScheduler, OneCycleLR};
