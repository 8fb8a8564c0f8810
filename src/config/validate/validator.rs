//! Configuration validation logic
//!
//! Validates training specifications for correctness before execution.

use super::error::ValidationError;
use crate::config::schema::{TrainSpec, NUM_LABEL_REGIMES, NUM_LOSS_TERMS};

/// Validate a training specification
///
/// Checks:
/// - Numeric values are in valid ranges
/// - Per-regime and per-term lists have the expected lengths
/// - The loss term lists line up with each other
pub fn validate_config(spec: &TrainSpec) -> Result<(), ValidationError> {
    if spec.model_name.trim().is_empty() {
        return Err(ValidationError::EmptyModelName);
    }

    validate_data(spec)?;
    validate_model(spec)?;
    validate_optimizer(spec)?;
    validate_loss(spec)?;
    validate_trainer(spec)?;

    Ok(())
}

fn validate_data(spec: &TrainSpec) -> Result<(), ValidationError> {
    if spec.oversampling_weights.len() != NUM_LABEL_REGIMES {
        return Err(ValidationError::OversamplingLength {
            expected: NUM_LABEL_REGIMES,
            actual: spec.oversampling_weights.len(),
        });
    }
    for &w in &spec.oversampling_weights {
        if !w.is_finite() || w < 0.0 {
            return Err(ValidationError::InvalidOversamplingWeight(w));
        }
    }
    if spec.oversampling_weights.iter().all(|&w| w == 0.0) {
        return Err(ValidationError::AllStreamsDisabled);
    }

    if !(spec.batch_max_length > 0.0 && spec.batch_max_length.is_finite()) {
        return Err(ValidationError::InvalidBatchMaxLength(spec.batch_max_length));
    }
    if !(spec.binning_length > 0.0 && spec.binning_length.is_finite()) {
        return Err(ValidationError::InvalidBinningLength(spec.binning_length));
    }
    if spec.dataloader_workers > 0 && spec.dataloader_prefetch_factor == 0 {
        return Err(ValidationError::InvalidPrefetchFactor(spec.dataloader_prefetch_factor));
    }
    Ok(())
}

fn validate_model(spec: &TrainSpec) -> Result<(), ValidationError> {
    let model = &spec.model;
    let dims = [
        ("hidden_dims", model.hidden_dims as f64),
        ("down_sampling_factor", model.down_sampling_factor as f64),
        ("channels_scaleup_factor", f64::from(model.channels_scaleup_factor)),
    ];
    for (field, value) in dims {
        if value <= 0.0 {
            return Err(ValidationError::InvalidModelDim { field, value });
        }
    }
    Ok(())
}

fn validate_optimizer(spec: &TrainSpec) -> Result<(), ValidationError> {
    let opt = &spec.optimizer_config;
    if opt.total_steps == 0 {
        return Err(ValidationError::InvalidTotalSteps(opt.total_steps));
    }
    for (group, lr) in [("backbone", opt.lr.backbone), ("head", opt.lr.head)] {
        if lr <= 0.0 || lr > 1.0 || lr.is_nan() {
            return Err(ValidationError::InvalidLearningRate { group, lr });
        }
    }
    if opt.weight_decay < 0.0 || !opt.weight_decay.is_finite() {
        return Err(ValidationError::InvalidWeightDecay(opt.weight_decay));
    }
    if !(opt.pct_start > 0.0 && opt.pct_start < 1.0) {
        return Err(ValidationError::InvalidPctStart(opt.pct_start));
    }
    Ok(())
}

fn validate_loss(spec: &TrainSpec) -> Result<(), ValidationError> {
    let losses = &spec.loss_config.losses;
    if losses.weights.len() != losses.enable_ramp_up.len() {
        return Err(ValidationError::LossListLengthMismatch {
            weights: losses.weights.len(),
            ramp: losses.enable_ramp_up.len(),
        });
    }
    if losses.weights.len() != NUM_LOSS_TERMS {
        return Err(ValidationError::LossTermCount {
            expected: NUM_LOSS_TERMS,
            actual: losses.weights.len(),
        });
    }
    for (index, &weight) in losses.weights.iter().enumerate() {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ValidationError::InvalidLossWeight { index, weight });
        }
    }

    let function = &spec.loss_config.function;
    if function.num_bins == 0 {
        return Err(ValidationError::InvalidNumBins(function.num_bins));
    }
    if !(0.0..1.0).contains(&function.alpha) {
        return Err(ValidationError::InvalidAlpha(function.alpha));
    }
    if !(0.0..1.0).contains(&function.label_smoothing) {
        return Err(ValidationError::InvalidLabelSmoothing(function.label_smoothing));
    }
    if !(0.0..=1.0).contains(&function.pseudo_label_ratio) {
        return Err(ValidationError::InvalidPseudoLabelRatio(function.pseudo_label_ratio));
    }

    let ramp = &spec.loss_config.ramp_up;
    if let (Some(start), Some(end)) = (ramp.start_steps, ramp.end_steps) {
        if end < start {
            return Err(ValidationError::InvalidRampWindow { start, end });
        }
    }
    let total_steps = spec.optimizer_config.total_steps;
    if let Some(start) = ramp.start_steps.filter(|&s| s > total_steps) {
        return Err(ValidationError::RampStartBeyondTotal { start, total_steps });
    }
    Ok(())
}

fn validate_trainer(spec: &TrainSpec) -> Result<(), ValidationError> {
    if !(spec.gradient_clip_val > 0.0 && spec.gradient_clip_val.is_finite()) {
        return Err(ValidationError::InvalidGradClip(spec.gradient_clip_val));
    }
    if spec.val_check_interval == 0 {
        return Err(ValidationError::InvalidValCheckInterval(spec.val_check_interval));
    }
    if spec.checkpoint_interval == Some(0) {
        return Err(ValidationError::InvalidCheckpointInterval(0));
    }
    if spec.num_ckpt_keep == 0 {
        return Err(ValidationError::InvalidCheckpointKeep(spec.num_ckpt_keep));
    }
    if spec.checkpoint_retries == 0 {
        return Err(ValidationError::InvalidCheckpointRetries(spec.checkpoint_retries));
    }
    Ok(())
}
