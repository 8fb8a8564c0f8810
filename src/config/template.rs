//! Built-in configuration template
//!
//! `alinear init` renders this spec to YAML. Tests use it as a known-good
//! baseline and tweak single fields.

use super::schema::{
    ClipAlgorithm, Devices, GroupFreeze, GroupLr, LossFunctionSpec, LossSpec, LossTermsSpec,
    LrSchedulerKind, ModelSpec, OptimizerSpec, RampUpSpec, TrainSpec,
};
use crate::error::Result;
use crate::precision::Precision;

/// Default loss weights, one per term in `LossTerm::ALL` order
pub const DEFAULT_LOSS_WEIGHTS: [f32; 7] = [10.0, 0.1, 0.01, 0.1, 1.0, 1.0, 0.5];

/// Default ramp flags; the unsupervised terms wait for the ramp-up start
pub const DEFAULT_RAMP_FLAGS: [bool; 7] = [false, false, false, true, true, true, true];

/// Baseline training specification
pub fn default_spec() -> TrainSpec {
    TrainSpec {
        model_name: "aligner".to_string(),
        float32_matmul_precision: "high".to_string(),
        random_seed: 114514,
        dataloader_workers: 0,
        dataloader_prefetch_factor: 2,
        oversampling_weights: vec![1.0, 1.0, 1.0],
        batch_max_length: 100.0,
        binning_length: 1000.0,
        drop_last: false,
        data_augmentation_size: 0,
        model: ModelSpec {
            hidden_dims: 192,
            down_sampling_factor: 3,
            down_sampling_times: 7,
            channels_scaleup_factor: 1.5,
        },
        optimizer_config: OptimizerSpec {
            total_steps: 100_000,
            weight_decay: 0.1,
            lr: GroupLr { backbone: 0.0005, head: 0.0005 },
            freeze: GroupFreeze::default(),
            lr_scheduler: LrSchedulerKind::OneCycle,
            pct_start: 0.3,
        },
        loss_config: LossSpec {
            losses: LossTermsSpec {
                weights: DEFAULT_LOSS_WEIGHTS.to_vec(),
                enable_ramp_up: DEFAULT_RAMP_FLAGS.to_vec(),
            },
            function: LossFunctionSpec {
                num_bins: 10,
                alpha: 0.999,
                label_smoothing: 0.08,
                pseudo_label_ratio: 0.3,
            },
            ramp_up: RampUpSpec::default(),
        },
        accelerator: "auto".to_string(),
        devices: Devices::default(),
        precision: Precision::Bf16,
        gradient_clip_val: 0.5,
        gradient_clip_algorithm: ClipAlgorithm::Norm,
        val_check_interval: 500,
        num_ckpt_keep: 5,
        checkpoint_interval: None,
        epoch_restart: true,
        max_consecutive_nonfinite: 8,
        checkpoint_retries: 3,
        checkpoint_backoff_ms: 50,
        log_every_n_steps: 50,
    }
}

/// Render the baseline spec as a YAML document, optionally renamed
pub fn render_template(model_name: Option<&str>) -> Result<String> {
    let mut spec = default_spec();
    if let Some(name) = model_name {
        spec.model_name = name.to_string();
    }
    Ok(serde_yaml::to_string(&spec)?)
}
