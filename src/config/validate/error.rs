//! Validation error types
//!
//! Defines all validation error variants for training specifications.

/// Validation error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("model_name must not be empty")]
    EmptyModelName,

    #[error("Invalid oversampling_weights: expected {expected} entries (full, weak, none), got {actual}")]
    OversamplingLength { expected: usize, actual: usize },

    #[error("Invalid oversampling weight {0} (must be finite and >= 0)")]
    InvalidOversamplingWeight(f64),

    #[error("All oversampling weights are zero; no stream can be drawn from")]
    AllStreamsDisabled,

    #[error("Invalid batch_max_length: {0} (must be > 0)")]
    InvalidBatchMaxLength(f64),

    #[error("Invalid binning_length: {0} (must be > 0)")]
    InvalidBinningLength(f64),

    #[error("Invalid dataloader_prefetch_factor: {0} (must be > 0 when workers are used)")]
    InvalidPrefetchFactor(usize),

    #[error("Invalid model.{field}: {value} (must be > 0)")]
    InvalidModelDim { field: &'static str, value: f64 },

    #[error("Invalid total_steps: {0} (must be > 0)")]
    InvalidTotalSteps(u64),

    #[error("Invalid learning rate for {group}: {lr} (must be > 0.0 and <= 1.0)")]
    InvalidLearningRate { group: &'static str, lr: f32 },

    #[error("Invalid weight_decay: {0} (must be >= 0.0)")]
    InvalidWeightDecay(f32),

    #[error("Invalid pct_start: {0} (must be in (0.0, 1.0))")]
    InvalidPctStart(f32),

    #[error("Loss term lists differ in length: weights has {weights}, enable_RampUpScheduler has {ramp}")]
    LossListLengthMismatch { weights: usize, ramp: usize },

    #[error("Expected {expected} loss terms, got {actual}")]
    LossTermCount { expected: usize, actual: usize },

    #[error("Invalid loss weight at index {index}: {weight} (must be finite and >= 0)")]
    InvalidLossWeight { index: usize, weight: f32 },

    #[error("Invalid num_bins: {0} (must be > 0)")]
    InvalidNumBins(usize),

    #[error("Invalid alpha: {0} (must be in [0.0, 1.0))")]
    InvalidAlpha(f32),

    #[error("Invalid label_smoothing: {0} (must be in [0.0, 1.0))")]
    InvalidLabelSmoothing(f32),

    #[error("Invalid pseudo_label_ratio: {0} (must be in [0.0, 1.0])")]
    InvalidPseudoLabelRatio(f32),

    #[error("Invalid ramp-up window: end step {end} is before start step {start}")]
    InvalidRampWindow { start: u64, end: u64 },

    #[error("Invalid ramp-up start step {start}: beyond total_steps {total_steps}")]
    RampStartBeyondTotal { start: u64, total_steps: u64 },

    #[error("Invalid gradient_clip_val: {0} (must be > 0.0)")]
    InvalidGradClip(f32),

    #[error("Invalid val_check_interval: {0} (must be > 0)")]
    InvalidValCheckInterval(u64),

    #[error("Invalid checkpoint_interval: {0} (must be > 0)")]
    InvalidCheckpointInterval(u64),

    #[error("Invalid num_ckpt_keep: {0} (must be > 0)")]
    InvalidCheckpointKeep(usize),

    #[error("Invalid checkpoint_retries: {0} (must be > 0)")]
    InvalidCheckpointRetries(usize),
}
