//! Configuration for mixed-precision training.

use super::Precision;

/// Number of overflow-free steps before the loss scale grows
const DEFAULT_SCALE_GROWTH_INTERVAL: usize = 2000;

/// Configuration for mixed-precision training
#[derive(Debug, Clone)]
pub struct MixedPrecisionConfig {
    /// Precision for activations and loss inputs
    pub compute_precision: Precision,
    /// Initial loss scale factor
    pub initial_scale: f32,
    /// Factor to increase scale by on successful step
    pub scale_growth_factor: f32,
    /// Factor to decrease scale by on overflow
    pub scale_backoff_factor: f32,
    /// Number of successful steps before increasing scale
    pub scale_growth_interval: usize,
    /// Whether to use dynamic loss scaling
    pub dynamic_scaling: bool,
}

impl MixedPrecisionConfig {
    /// Create fp32 config (no mixed precision)
    pub fn fp32() -> Self {
        Self {
            compute_precision: Precision::Fp32,
            initial_scale: 1.0,
            scale_growth_factor: 2.0,
            scale_backoff_factor: 0.5,
            scale_growth_interval: DEFAULT_SCALE_GROWTH_INTERVAL,
            dynamic_scaling: false,
        }
    }

    /// Create fp16 mixed-precision config
    pub fn fp16() -> Self {
        Self {
            compute_precision: Precision::Fp16,
            initial_scale: 65536.0, // 2^16
            scale_growth_factor: 2.0,
            scale_backoff_factor: 0.5,
            scale_growth_interval: DEFAULT_SCALE_GROWTH_INTERVAL,
            dynamic_scaling: true,
        }
    }

    /// Create bf16 mixed-precision config
    pub fn bf16() -> Self {
        Self {
            compute_precision: Precision::Bf16,
            initial_scale: 1.0, // bf16 keeps the f32 exponent range
            scale_growth_factor: 2.0,
            scale_backoff_factor: 0.5,
            scale_growth_interval: DEFAULT_SCALE_GROWTH_INTERVAL,
            dynamic_scaling: false,
        }
    }

    /// Config matching a run precision
    pub fn for_precision(precision: Precision) -> Self {
        match precision {
            Precision::Fp32 => Self::fp32(),
            Precision::Fp16 => Self::fp16(),
            Precision::Bf16 => Self::bf16(),
        }
    }

    /// Check if mixed precision is enabled
    pub fn is_mixed(&self) -> bool {
        self.compute_precision.is_reduced()
    }

    /// Whether a loss scaler is needed at all
    pub fn needs_scaler(&self) -> bool {
        self.dynamic_scaling || (self.initial_scale - 1.0).abs() > f32::EPSILON
    }

    /// Set initial loss scale
    pub fn with_initial_scale(mut self, scale: f32) -> Self {
        self.initial_scale = scale;
        self
    }

    /// Enable/disable dynamic scaling
    pub fn with_dynamic_scaling(mut self, enabled: bool) -> Self {
        self.dynamic_scaling = enabled;
        self
    }
}
