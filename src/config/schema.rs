//! YAML schema definitions for the training configuration document
//!
//! Field names follow the configuration file verbatim (including
//! `enable_RampUpScheduler`), so an existing `train_config.yaml` loads
//! without translation.

use crate::precision::Precision;
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

/// Number of loss terms the composite loss is built from
pub const NUM_LOSS_TERMS: usize = 7;

/// Number of label regimes (full, weak, none)
pub const NUM_LABEL_REGIMES: usize = 3;

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrString {
    Bool(bool),
    Str(String),
}

impl BoolOrString {
    fn into_bool<E: serde::de::Error>(self) -> Result<bool, E> {
        match self {
            BoolOrString::Bool(b) => Ok(b),
            BoolOrString::Str(s) => match s.to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(E::custom(format!("expected 'true' or 'false', got '{other}'"))),
            },
        }
    }
}

/// Deserialize a bool from either a YAML boolean (`true`) or a string
/// (`"True"`, `"false"`).
fn deserialize_bool_lenient<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    BoolOrString::deserialize(deserializer)?.into_bool()
}

/// Lenient bool deserialization for every element of a list
fn deserialize_bool_vec_lenient<'de, D>(deserializer: D) -> Result<Vec<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<BoolOrString>::deserialize(deserializer)?
        .into_iter()
        .map(BoolOrString::into_bool)
        .collect()
}

/// Complete training specification (the immutable run configuration)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainSpec {
    /// Run name; checkpoints land in `ckpt/<model_name>/`
    pub model_name: String,

    /// Matmul precision hint forwarded to the model executor
    #[serde(default = "default_matmul_precision")]
    pub float32_matmul_precision: String,

    /// Seed for every random draw the orchestrator makes
    pub random_seed: u64,

    /// Number of example-loading worker threads (0 = load inline)
    pub dataloader_workers: usize,

    /// Batches each worker may have in flight ahead of consumption
    pub dataloader_prefetch_factor: usize,

    /// Relative draw weights for the full, weak and no-label streams
    pub oversampling_weights: Vec<f64>,

    /// Upper bound on the summed duration of one batch (seconds)
    pub batch_max_length: f64,

    /// Width of a duration bin (seconds)
    pub binning_length: f64,

    /// Discard the trailing under-full batch of each bin
    #[serde(deserialize_with = "deserialize_bool_lenient")]
    pub drop_last: bool,

    /// Number of augmented copies per example; any value above zero halves
    /// the batch duration budget
    #[serde(default)]
    pub data_augmentation_size: usize,

    /// Model architecture hyperparameters
    pub model: ModelSpec,

    /// Optimizer configuration
    pub optimizer_config: OptimizerSpec,

    /// Composite loss configuration
    pub loss_config: LossSpec,

    /// Accelerator name forwarded to the model executor
    #[serde(default = "default_auto")]
    pub accelerator: String,

    /// Device count or `auto`
    #[serde(default)]
    pub devices: Devices,

    /// Compute precision (`32-true`, `bf16-mixed`, `16-mixed`)
    #[serde(default)]
    pub precision: Precision,

    /// Gradient clipping threshold
    pub gradient_clip_val: f32,

    /// Gradient clipping algorithm
    #[serde(default)]
    pub gradient_clip_algorithm: ClipAlgorithm,

    /// Run validation every N steps
    pub val_check_interval: u64,

    /// Number of most recent checkpoints to retain
    pub num_ckpt_keep: usize,

    /// Persist a checkpoint every N steps (defaults to `val_check_interval`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_interval: Option<u64>,

    /// Start a new epoch when the example streams are used up
    #[serde(default = "default_true", deserialize_with = "deserialize_bool_lenient")]
    pub epoch_restart: bool,

    /// Consecutive non-finite steps tolerated before the run fails
    #[serde(default = "default_max_consecutive_nonfinite")]
    pub max_consecutive_nonfinite: usize,

    /// Attempts per checkpoint save/load before giving up
    #[serde(default = "default_checkpoint_retries")]
    pub checkpoint_retries: usize,

    /// Initial backoff between checkpoint attempts (doubles per retry)
    #[serde(default = "default_checkpoint_backoff_ms")]
    pub checkpoint_backoff_ms: u64,

    /// Emit a progress event every N steps
    #[serde(default = "default_log_every_n_steps")]
    pub log_every_n_steps: u64,
}

/// Model architecture hyperparameters, consumed by the model executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Hidden channel width
    pub hidden_dims: usize,
    /// Temporal down-sampling factor per stage
    pub down_sampling_factor: usize,
    /// Number of down-sampling stages
    pub down_sampling_times: usize,
    /// Channel growth per stage
    pub channels_scaleup_factor: f32,
}

/// Device selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Devices {
    /// Explicit device count
    Count(usize),
    /// Named selection, e.g. `auto`
    Named(String),
}

impl Default for Devices {
    fn default() -> Self {
        Devices::Named(default_auto())
    }
}

/// Gradient clipping algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipAlgorithm {
    /// Scale all gradients so the global L2 norm is at most the threshold
    #[default]
    Norm,
    /// Clamp each gradient element into `[-threshold, threshold]`
    Value,
}

/// A value per parameter group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupLr {
    /// Backbone learning rate
    pub backbone: f32,
    /// Head learning rate
    pub head: f32,
}

/// Freeze flags per parameter group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupFreeze {
    /// Exclude backbone parameters from updates
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub backbone: bool,
    /// Exclude head parameters from updates
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub head: bool,
}

/// Learning-rate schedule kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LrSchedulerKind {
    /// Warmup to the group lr then cosine-anneal over `total_steps`
    #[default]
    OneCycle,
    /// Keep the configured lr for the whole run
    Constant,
}

/// Optimizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerSpec {
    /// Hard step budget for the run
    pub total_steps: u64,
    /// Decoupled AdamW weight decay
    pub weight_decay: f32,
    /// Per-group learning rate
    pub lr: GroupLr,
    /// Per-group freeze flags
    #[serde(default)]
    pub freeze: GroupFreeze,
    /// Learning-rate schedule
    #[serde(default)]
    pub lr_scheduler: LrSchedulerKind,
    /// Fraction of the run spent warming up (one-cycle only)
    #[serde(default = "default_pct_start")]
    pub pct_start: f32,
}

/// Composite loss configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossSpec {
    /// Per-term weights and ramp flags
    pub losses: LossTermsSpec,
    /// Shared loss-function hyperparameters
    pub function: LossFunctionSpec,
    /// Ramp-up policy for terms with their ramp flag set
    #[serde(default)]
    pub ramp_up: RampUpSpec,
}

/// Per-term lists, indexed positionally
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossTermsSpec {
    /// Static weight of each term
    pub weights: Vec<f32>,
    /// Whether each term waits for the ramp-up start
    #[serde(rename = "enable_RampUpScheduler", deserialize_with = "deserialize_bool_vec_lenient")]
    pub enable_ramp_up: Vec<bool>,
}

/// Loss-function hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossFunctionSpec {
    /// Histogram bins for gradient-harmonized weighting
    pub num_bins: usize,
    /// EMA decay of the bin density
    pub alpha: f32,
    /// Label smoothing for frame classification
    pub label_smoothing: f32,
    /// Fraction of most confident frames used as pseudo-labels
    pub pseudo_label_ratio: f32,
}

/// Ramp-up activation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RampPolicyKind {
    /// Gate jumps from 0 to 1 at the start step
    #[default]
    Step,
    /// Gate follows `exp(-5 (1 - progress)^2)` between start and end
    Gaussian,
}

/// Ramp-up schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RampUpSpec {
    /// Activation curve
    #[serde(default)]
    pub policy: RampPolicyKind,
    /// First active step (defaults to 10% of `total_steps`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_steps: Option<u64>,
    /// Step at which the Gaussian curve reaches 1 (defaults to twice the start)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_steps: Option<u64>,
}

impl TrainSpec {
    /// Batch duration budget after accounting for augmentation
    ///
    /// Augmented copies travel in the same batch as their source example,
    /// so the budget for source examples is halved.
    pub fn effective_batch_max_length(&self) -> f64 {
        if self.data_augmentation_size > 0 {
            self.batch_max_length / 2.0
        } else {
            self.batch_max_length
        }
    }

    /// Steps between checkpoints
    pub fn checkpoint_interval(&self) -> u64 {
        self.checkpoint_interval.unwrap_or(self.val_check_interval)
    }

    /// First step at which ramped terms are active
    pub fn ramp_start_step(&self) -> u64 {
        self.loss_config
            .ramp_up
            .start_steps
            .unwrap_or(self.optimizer_config.total_steps / 10)
    }

    /// Step at which a Gaussian ramp reaches full strength
    pub fn ramp_end_step(&self) -> u64 {
        let start = self.ramp_start_step();
        self.loss_config
            .ramp_up
            .end_steps
            .unwrap_or_else(|| start.saturating_mul(2).max(start.saturating_add(1)))
    }

    /// Stable hex digest identifying this configuration
    ///
    /// Stored with every checkpoint so a resumed run can detect that the
    /// configuration changed underneath it.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}

fn default_matmul_precision() -> String {
    "high".to_string()
}

fn default_auto() -> String {
    "auto".to_string()
}

fn default_true() -> bool {
    true
}

fn default_pct_start() -> f32 {
    0.3
}

fn default_max_consecutive_nonfinite() -> usize {
    8
}

fn default_checkpoint_retries() -> usize {
    3
}

fn default_checkpoint_backoff_ms() -> u64 {
    50
}

fn default_log_every_n_steps() -> u64 {
    50
}
