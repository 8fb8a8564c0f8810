//! Unit tests for configuration validation

use super::error::ValidationError;
use super::validator::validate_config;
use crate::config::schema::*;
use crate::config::template::default_spec;

fn create_valid_spec() -> TrainSpec {
    default_spec()
}

#[test]
fn test_valid_config() {
    let spec = create_valid_spec();
    assert!(validate_config(&spec).is_ok());
}

#[test]
fn test_empty_model_name() {
    let mut spec = create_valid_spec();
    spec.model_name = "  ".to_string();
    assert_eq!(validate_config(&spec), Err(ValidationError::EmptyModelName));
}

#[test]
fn test_oversampling_length() {
    let mut spec = create_valid_spec();
    spec.oversampling_weights = vec![1.0, 1.0];
    let err = validate_config(&spec).unwrap_err();
    assert!(matches!(err, ValidationError::OversamplingLength { expected: 3, actual: 2 }));
}

#[test]
fn test_negative_oversampling_weight() {
    let mut spec = create_valid_spec();
    spec.oversampling_weights = vec![1.0, -1.0, 1.0];
    let err = validate_config(&spec).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidOversamplingWeight(_)));
}

#[test]
fn test_all_streams_disabled() {
    let mut spec = create_valid_spec();
    spec.oversampling_weights = vec![0.0, 0.0, 0.0];
    assert_eq!(validate_config(&spec), Err(ValidationError::AllStreamsDisabled));
}

#[test]
fn test_single_disabled_stream_is_fine() {
    let mut spec = create_valid_spec();
    spec.oversampling_weights = vec![1.0, 0.0, 2.0];
    assert!(validate_config(&spec).is_ok());
}

#[test]
fn test_invalid_batch_max_length() {
    let mut spec = create_valid_spec();
    spec.batch_max_length = 0.0;
    let err = validate_config(&spec).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidBatchMaxLength(_)));
}

#[test]
fn test_invalid_binning_length() {
    let mut spec = create_valid_spec();
    spec.binning_length = -5.0;
    let err = validate_config(&spec).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidBinningLength(_)));
}

#[test]
fn test_zero_prefetch_with_workers() {
    let mut spec = create_valid_spec();
    spec.dataloader_workers = 2;
    spec.dataloader_prefetch_factor = 0;
    assert_eq!(validate_config(&spec), Err(ValidationError::InvalidPrefetchFactor(0)));

    spec.dataloader_workers = 0;
    assert!(validate_config(&spec).is_ok());
}

#[test]
fn test_invalid_hidden_dims() {
    let mut spec = create_valid_spec();
    spec.model.hidden_dims = 0;
    let err = validate_config(&spec).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidModelDim { field: "hidden_dims", .. }));
}

#[test]
fn test_invalid_total_steps() {
    let mut spec = create_valid_spec();
    spec.optimizer_config.total_steps = 0;
    assert_eq!(validate_config(&spec), Err(ValidationError::InvalidTotalSteps(0)));
}

#[test]
fn test_invalid_learning_rate() {
    let mut spec = create_valid_spec();
    spec.optimizer_config.lr.head = 0.0;
    let err = validate_config(&spec).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidLearningRate { group: "head", .. }));

    spec.optimizer_config.lr.head = 0.001;
    spec.optimizer_config.lr.backbone = 2.0;
    let err = validate_config(&spec).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidLearningRate { group: "backbone", .. }));
}

#[test]
fn test_invalid_weight_decay() {
    let mut spec = create_valid_spec();
    spec.optimizer_config.weight_decay = -0.1;
    let err = validate_config(&spec).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidWeightDecay(_)));
}

#[test]
fn test_loss_list_length_mismatch() {
    let mut spec = create_valid_spec();
    spec.loss_config.losses.enable_ramp_up.pop();
    let err = validate_config(&spec).unwrap_err();
    assert_eq!(err, ValidationError::LossListLengthMismatch { weights: 7, ramp: 6 });
}

#[test]
fn test_loss_term_count() {
    let mut spec = create_valid_spec();
    spec.loss_config.losses.weights.push(1.0);
    spec.loss_config.losses.enable_ramp_up.push(false);
    let err = validate_config(&spec).unwrap_err();
    assert_eq!(err, ValidationError::LossTermCount { expected: 7, actual: 8 });
}

#[test]
fn test_negative_loss_weight() {
    let mut spec = create_valid_spec();
    spec.loss_config.losses.weights[3] = -1.0;
    let err = validate_config(&spec).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidLossWeight { index: 3, .. }));
}

#[test]
fn test_zero_loss_weight_is_allowed() {
    let mut spec = create_valid_spec();
    spec.loss_config.losses.weights[6] = 0.0;
    assert!(validate_config(&spec).is_ok());
}

#[test]
fn test_invalid_loss_function_params() {
    let mut spec = create_valid_spec();
    spec.loss_config.function.num_bins = 0;
    assert_eq!(validate_config(&spec), Err(ValidationError::InvalidNumBins(0)));

    let mut spec = create_valid_spec();
    spec.loss_config.function.alpha = 1.0;
    assert!(matches!(validate_config(&spec), Err(ValidationError::InvalidAlpha(_))));

    let mut spec = create_valid_spec();
    spec.loss_config.function.label_smoothing = 1.5;
    assert!(matches!(validate_config(&spec), Err(ValidationError::InvalidLabelSmoothing(_))));

    let mut spec = create_valid_spec();
    spec.loss_config.function.pseudo_label_ratio = 1.1;
    assert!(matches!(validate_config(&spec), Err(ValidationError::InvalidPseudoLabelRatio(_))));
}

#[test]
fn test_invalid_ramp_window() {
    let mut spec = create_valid_spec();
    spec.loss_config.ramp_up.start_steps = Some(100);
    spec.loss_config.ramp_up.end_steps = Some(50);
    let err = validate_config(&spec).unwrap_err();
    assert_eq!(err, ValidationError::InvalidRampWindow { start: 100, end: 50 });
}

#[test]
fn test_ramp_start_beyond_total_steps() {
    let mut spec = create_valid_spec();
    spec.loss_config.ramp_up.start_steps = Some(u64::MAX);
    let err = validate_config(&spec).unwrap_err();
    assert_eq!(
        err,
        ValidationError::RampStartBeyondTotal { start: u64::MAX, total_steps: spec.optimizer_config.total_steps }
    );

    spec.loss_config.ramp_up.start_steps = Some(spec.optimizer_config.total_steps);
    assert!(validate_config(&spec).is_ok());
}

#[test]
fn test_invalid_grad_clip() {
    let mut spec = create_valid_spec();
    spec.gradient_clip_val = 0.0;
    assert!(matches!(validate_config(&spec), Err(ValidationError::InvalidGradClip(_))));
}

#[test]
fn test_invalid_trainer_intervals() {
    let mut spec = create_valid_spec();
    spec.val_check_interval = 0;
    assert_eq!(validate_config(&spec), Err(ValidationError::InvalidValCheckInterval(0)));

    let mut spec = create_valid_spec();
    spec.checkpoint_interval = Some(0);
    assert_eq!(validate_config(&spec), Err(ValidationError::InvalidCheckpointInterval(0)));

    let mut spec = create_valid_spec();
    spec.num_ckpt_keep = 0;
    assert_eq!(validate_config(&spec), Err(ValidationError::InvalidCheckpointKeep(0)));

    let mut spec = create_valid_spec();
    spec.checkpoint_retries = 0;
    assert_eq!(validate_config(&spec), Err(ValidationError::InvalidCheckpointRetries(0)));
}

#[test]
fn test_error_messages_name_the_field() {
    let err = ValidationError::LossListLengthMismatch { weights: 7, ramp: 5 };
    assert!(err.to_string().contains("enable_RampUpScheduler"));
}
