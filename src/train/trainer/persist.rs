//! Checkpointing, resumption and pretrained initialisation

use super::core::Trainer;
use super::phase::Phase;
use super::result::TrainResult;
use crate::error::{Error, Result};
use crate::train::checkpoint::{load_weights, save_weights, CheckpointRing};
use crate::train::state::{TrainingState, WeightsFile};
use chrono::Utc;
use std::path::Path;

impl Trainer {
    /// Current training state
    pub fn snapshot(&self) -> TrainingState {
        TrainingState {
            model_name: self.spec.model_name.clone(),
            step: self.step(),
            sampler: self.sampler.position(),
            optimizer: self.controller.state(),
            loss: self.loss.state(),
            params: self.model.params().to_vec(),
            config_fingerprint: self.fingerprint.clone(),
            created_at: Utc::now(),
        }
    }

    /// Restore every component from a saved state
    pub fn restore(&mut self, state: TrainingState) -> Result<()> {
        if state.config_fingerprint != self.fingerprint {
            tracing::warn!(
                step = state.step,
                saved = %state.config_fingerprint,
                current = %self.fingerprint,
                "configuration changed since the checkpoint was written"
            );
        }
        self.model.load_params(&state.params)?;
        self.loss.load(&state.loss);
        self.sampler.seek(state.sampler)?;
        self.controller.load(state.optimizer);
        Ok(())
    }

    /// Resume from the highest-step checkpoint in the store
    ///
    /// Returns the step resumed from, or `None` when the store is empty.
    /// A checkpoint that exists but cannot be read is fatal.
    pub fn resume_latest(&mut self) -> Result<Option<u64>> {
        let store = &self.store;
        let steps = self.retry.run("list", || store.list())?;
        let Some(&latest) = steps.last() else {
            tracing::info!(store = %self.store.describe(), "no checkpoint found, starting fresh");
            return Ok(None);
        };
        let state = self.retry.run("load", || store.load(latest))?;
        if state.step != latest {
            return Err(Error::checkpoint_io(
                self.store.describe(),
                format!("checkpoint for step {latest} records step {}", state.step),
            ));
        }
        self.restore(state)?;
        self.ring = CheckpointRing::with_existing(self.spec.num_ckpt_keep, steps);
        self.resumed_from = Some(latest);
        tracing::info!(step = latest, position = ?self.sampler.position(), "resumed from checkpoint");
        Ok(Some(latest))
    }

    /// Load parameters only; step, optimizer and sampler state stay fresh
    pub fn init_from_pretrained(&mut self, path: &Path) -> Result<()> {
        let params = self.retry.run("load", || load_weights(path))?;
        self.model.load_params(&params)?;
        tracing::info!(path = %path.display(), params = params.len(), "initialised from pretrained weights");
        Ok(())
    }

    /// CHECKPOINTING: persist the state and evict beyond `num_ckpt_keep`
    ///
    /// A save that still fails after the retries is logged and counted;
    /// training continues.
    pub(crate) fn checkpoint(&mut self, result: &mut TrainResult) {
        self.transition(Phase::Checkpointing);
        let state = self.snapshot();
        let step = state.step;
        let store = &mut self.store;
        match self.retry.run("save", || store.save(&state)) {
            Ok(()) => {
                for evicted in self.ring.push(step) {
                    let store = &mut self.store;
                    if let Err(e) = self.retry.run("delete", || store.delete(evicted)) {
                        tracing::warn!(step = evicted, error = %e, "failed to evict old checkpoint");
                    }
                }
                tracing::info!(step, retained = ?self.ring.steps(), "checkpoint saved");
                let ctx = self.build_context();
                self.callbacks.on_checkpoint(&ctx);
            }
            Err(e) => {
                result.failed_saves += 1;
                tracing::error!(step, error = %e, "checkpoint save failed, continuing without it");
            }
        }
    }

    /// Weights-only checkpoint for fine-tune runs
    pub(crate) fn save_final_weights(&mut self, path: &Path, result: &mut TrainResult) {
        let weights = WeightsFile::from(&self.snapshot());
        match self.retry.run("save", || save_weights(path, &weights)) {
            Ok(()) => tracing::info!(path = %path.display(), step = weights.step, "weights saved"),
            Err(e) => {
                result.failed_saves += 1;
                tracing::error!(path = %path.display(), error = %e, "failed to save weights");
            }
        }
    }
}
