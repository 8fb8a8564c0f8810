//! Persisted training state

use super::loss::LossState;
use crate::data::SamplerPosition;
use crate::optim::{OptimizerSnapshot, Param};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything needed to continue a run exactly where it stopped
///
/// Owned by the trainer; workers never see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    pub model_name: String,
    /// Global step: optimizer steps consumed, including dropped ones
    pub step: u64,
    /// Sampler cursor after the batch of `step`
    pub sampler: SamplerPosition,
    pub optimizer: OptimizerSnapshot,
    pub loss: LossState,
    pub params: Vec<Param>,
    /// Fingerprint of the configuration the state was produced under
    pub config_fingerprint: String,
    pub created_at: DateTime<Utc>,
}

impl TrainingState {
    pub fn epoch(&self) -> u64 {
        self.sampler.epoch
    }

    pub fn nonfinite_steps(&self) -> u64 {
        self.optimizer.total_nonfinite
    }
}

/// Parameters only, written by fine-tune runs and read for pretrained
/// initialisation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightsFile {
    pub model_name: String,
    pub step: u64,
    pub params: Vec<Param>,
    pub config_fingerprint: String,
    pub created_at: DateTime<Utc>,
}

impl From<&TrainingState> for WeightsFile {
    fn from(state: &TrainingState) -> Self {
        Self {
            model_name: state.model_name.clone(),
            step: state.step,
            params: state.params.clone(),
            config_fingerprint: state.config_fingerprint.clone(),
            created_at: state.created_at,
        }
    }
}
