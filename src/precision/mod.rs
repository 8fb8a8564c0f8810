//! Mixed-precision compute support
//!
//! Loss terms are evaluated on inputs rounded to the run's compute
//! precision (`bf16-mixed`, `16-mixed` or `32-true`) while every reduction
//! accumulates in f64. Master weights and optimizer moments always stay in
//! f32.
//!
//! For `16-mixed` runs a dynamic [`GradScaler`] scales the loss before the
//! backward pass and unscales gradients before clipping; an overflow drops
//! the step and backs the scale off.

mod config;
mod conversions;
mod precision_types;
mod scaler;


pub use config::MixedPrecisionConfig;
pub use conversions::{bf16_to_f32, f32_to_bf16, f32_to_fp16, fp16_to_f32};
pub use precision_types::Precision;
pub use scaler::{GradScaler, ScalerState};
