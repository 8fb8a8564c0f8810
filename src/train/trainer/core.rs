//! Core Trainer struct and construction

use super::phase::Phase;
use crate::config::TrainSpec;
use crate::data::BatchSource;
use crate::error::{Error, Result};
use crate::optim::{GroupKind, OptimizationController};
use crate::train::callback::{CallbackContext, CallbackManager, ProgressCallback, TrainerCallback};
use crate::train::checkpoint::{CheckpointRing, CheckpointStore, RetryPolicy};
use crate::train::loss::CompositeLoss;
use crate::train::model::{Evaluator, ModelExecutor};
use crate::train::stop::StopSignal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Run-level switches that are not part of the configuration document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainerOptions {
    /// Persist `step=<n>.ckpt` every checkpoint interval
    pub periodic_checkpoints: bool,
    /// Write a weights-only checkpoint here when the run ends (fine-tune mode)
    pub final_weights: Option<PathBuf>,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self { periodic_checkpoints: true, final_weights: None }
    }
}

impl TrainerOptions {
    /// Fine-tune mode: no periodic checkpoints, weights written at the end
    pub fn fine_tune(final_weights: impl Into<PathBuf>) -> Self {
        Self { periodic_checkpoints: false, final_weights: Some(final_weights.into()) }
    }
}

/// Drives a training run from INIT to DONE
pub struct Trainer {
    pub(crate) spec: Arc<TrainSpec>,
    pub(crate) fingerprint: String,
    pub(crate) model: Box<dyn ModelExecutor>,
    pub(crate) sampler: Box<dyn BatchSource>,
    pub(crate) loss: CompositeLoss,
    pub(crate) controller: OptimizationController,
    pub(crate) evaluator: Option<Box<dyn Evaluator>>,
    pub(crate) store: Box<dyn CheckpointStore>,
    pub(crate) ring: CheckpointRing,
    pub(crate) retry: RetryPolicy,
    pub(crate) callbacks: CallbackManager,
    pub(crate) stop: StopSignal,
    pub(crate) options: TrainerOptions,
    pub(crate) phase: Phase,
    pub(crate) resumed_from: Option<u64>,
    pub(crate) start_time: Option<Instant>,
}

impl Trainer {
    /// Build every component from the configuration
    ///
    /// A progress callback logging every `log_every_n_steps` is installed.
    pub fn new(
        spec: Arc<TrainSpec>,
        model: Box<dyn ModelExecutor>,
        sampler: Box<dyn BatchSource>,
        store: Box<dyn CheckpointStore>,
    ) -> Result<Self> {
        if spec.val_check_interval == 0 {
            return Err(Error::Config("val_check_interval must be positive".into()));
        }
        let loss = CompositeLoss::from_spec(&spec)?;
        let controller = OptimizationController::from_spec(&spec);
        let mut callbacks = CallbackManager::new();
        callbacks.add(ProgressCallback::new(spec.log_every_n_steps));

        tracing::info!(
            model_name = %spec.model_name,
            total_steps = spec.optimizer_config.total_steps,
            params = model.params().len(),
            store = %store.describe(),
            "trainer initialised"
        );

        Ok(Self {
            fingerprint: spec.fingerprint(),
            ring: CheckpointRing::new(spec.num_ckpt_keep),
            retry: RetryPolicy::from_spec(&spec),
            spec,
            model,
            sampler,
            loss,
            controller,
            evaluator: None,
            store,
            callbacks,
            stop: StopSignal::new(),
            options: TrainerOptions::default(),
            phase: Phase::Init,
            resumed_from: None,
            start_time: None,
        })
    }

    pub fn with_evaluator(mut self, evaluator: Box<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn with_callback<C: TrainerCallback + 'static>(mut self, callback: C) -> Self {
        self.callbacks.add(callback);
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_options(mut self, options: TrainerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn spec(&self) -> &TrainSpec {
        &self.spec
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Global step: optimizer steps consumed so far
    pub fn step(&self) -> u64 {
        self.controller.steps_taken()
    }

    pub fn model(&self) -> &dyn ModelExecutor {
        self.model.as_ref()
    }

    pub fn loss(&self) -> &CompositeLoss {
        &self.loss
    }

    pub fn controller(&self) -> &OptimizationController {
        &self.controller
    }

    pub fn store(&self) -> &dyn CheckpointStore {
        self.store.as_ref()
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub(crate) fn transition(&mut self, next: Phase) {
        if self.phase == next {
            return;
        }
        if !self.phase.can_transition(next) {
            tracing::warn!(from = %self.phase, to = %next, "unexpected phase transition");
        }
        tracing::debug!(from = %self.phase, to = %next, step = self.step(), "phase");
        self.phase = next;
    }

    pub(crate) fn elapsed_secs(&self) -> f64 {
        self.start_time.map(|t| t.elapsed().as_secs_f64()).unwrap_or(0.0)
    }

    /// Callback context for the current state
    pub(crate) fn build_context(&self) -> CallbackContext {
        CallbackContext {
            step: self.step(),
            total_steps: self.spec.optimizer_config.total_steps,
            position: self.sampler.position(),
            lr: GroupKind::ALL.map(|g| self.controller.lr(g)),
            elapsed_secs: self.elapsed_secs(),
            ..Default::default()
        }
    }
}
