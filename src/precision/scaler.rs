//! Gradient scaler for mixed-precision training.

use super::MixedPrecisionConfig;
use serde::{Deserialize, Serialize};

/// Persistent part of a [`GradScaler`], stored in checkpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    /// Current loss scale
    pub scale: f32,
    /// Steps since last growth
    pub steps_since_growth: usize,
    /// Number of overflows encountered
    pub overflow_count: usize,
}

/// Gradient scaler for mixed-precision training
///
/// Handles loss scaling to prevent gradient underflow in fp16 training.
#[derive(Debug, Clone)]
pub struct GradScaler {
    scale: f32,
    growth_factor: f32,
    backoff_factor: f32,
    pub(crate) growth_interval: usize,
    steps_since_growth: usize,
    dynamic: bool,
    overflow_count: usize,
    successful_steps: usize,
}

impl GradScaler {
    /// Create a new gradient scaler
    pub fn new(initial_scale: f32) -> Self {
        Self::from_config(&MixedPrecisionConfig::fp16().with_initial_scale(initial_scale))
    }

    /// Create from config
    pub fn from_config(config: &MixedPrecisionConfig) -> Self {
        Self {
            scale: config.initial_scale,
            growth_factor: config.scale_growth_factor,
            backoff_factor: config.scale_backoff_factor,
            growth_interval: config.scale_growth_interval,
            steps_since_growth: 0,
            dynamic: config.dynamic_scaling,
            overflow_count: 0,
            successful_steps: 0,
        }
    }

    /// Get current scale
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Scale a loss value
    pub fn scale_loss(&self, loss: f32) -> f32 {
        loss * self.scale
    }

    /// Unscale gradients in place and check for overflow
    ///
    /// Returns true if gradients are valid (no overflow), false otherwise.
    pub fn unscale_and_check(&self, grads: &mut [f32]) -> bool {
        let inv_scale = 1.0 / self.scale;
        let mut has_overflow = false;

        for grad in grads.iter_mut() {
            *grad *= inv_scale;
            if !grad.is_finite() {
                has_overflow = true;
            }
        }

        !has_overflow
    }

    /// Update the scale after a step
    ///
    /// Call this after each optimizer step. Pass `true` if gradients were valid.
    pub fn update(&mut self, grads_valid: bool) {
        if !self.dynamic {
            return;
        }

        if grads_valid {
            self.successful_steps += 1;
            self.steps_since_growth += 1;

            if self.steps_since_growth >= self.growth_interval {
                self.scale *= self.growth_factor;
                self.steps_since_growth = 0;
            }
        } else {
            self.overflow_count += 1;
            self.scale = (self.scale * self.backoff_factor).max(1.0);
            self.steps_since_growth = 0;
        }
    }

    /// Get overflow count
    pub fn overflow_count(&self) -> usize {
        self.overflow_count
    }

    /// Get successful step count
    pub fn successful_steps(&self) -> usize {
        self.successful_steps
    }

    /// Check if dynamic scaling is enabled
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Snapshot for checkpointing
    pub fn state(&self) -> ScalerState {
        ScalerState {
            scale: self.scale,
            steps_since_growth: self.steps_since_growth,
            overflow_count: self.overflow_count,
        }
    }

    /// Restore from a checkpoint snapshot
    pub fn load(&mut self, state: &ScalerState) {
        self.scale = state.scale;
        self.steps_since_growth = state.steps_since_growth;
        self.overflow_count = state.overflow_count;
    }
}

impl Default for GradScaler {
    fn default() -> Self {
        Self::new(65536.0)
    }
}
