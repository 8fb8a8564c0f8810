//! Duration-bounded batch sampling across label regimes
//!
//! The [`Sampler`] plans each epoch on the calling thread (see [`Planner`])
//! and hands the plan to a [`Prefetcher`] that loads examples on
//! `dataloader_workers` threads. With zero workers examples load inline.

mod plan;
mod prefetch;

#[cfg(test)]
mod tests;

pub use plan::{EpochPlan, PlanConfig, PlannedBatch, Planner};
pub use prefetch::Prefetcher;

use crate::config::TrainSpec;
use crate::data::example::{Batch, LabelRegime};
use crate::data::source::ExampleSource;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Anything that yields training batches
pub trait BatchSource {
    /// Next batch; `Error::Exhausted` once the data runs out for good
    fn next_batch(&mut self) -> Result<Batch>;

    /// Where the next batch will come from
    fn position(&self) -> SamplerPosition;

    /// Continue from a previously reported position
    fn seek(&mut self, position: SamplerPosition) -> Result<()>;
}

/// Resumable cursor into the deterministic batch sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerPosition {
    pub epoch: u64,
    /// Batches of `epoch` already handed out
    pub batch: usize,
}

/// Sampler settings
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    pub plan: PlanConfig,
    pub workers: usize,
    pub prefetch_factor: usize,
    pub epoch_restart: bool,
}

impl SamplerConfig {
    /// Derive sampler settings from a training spec
    pub fn from_spec(spec: &TrainSpec) -> Self {
        let mut weights = [0.0; 3];
        for (slot, w) in weights.iter_mut().zip(&spec.oversampling_weights) {
            *slot = *w;
        }
        Self {
            plan: PlanConfig {
                weights,
                batch_max_length: spec.effective_batch_max_length(),
                binning_length: spec.binning_length,
                drop_last: spec.drop_last,
                seed: spec.random_seed,
            },
            workers: spec.dataloader_workers,
            prefetch_factor: spec.dataloader_prefetch_factor,
            epoch_restart: spec.epoch_restart,
        }
    }
}

/// Weighted, binned, prefetching batch sampler
pub struct Sampler {
    source: Arc<dyn ExampleSource>,
    planner: Planner,
    config: SamplerConfig,
    position: SamplerPosition,
    plan: Option<EpochPlan>,
    prefetcher: Option<Prefetcher>,
    skipped_oversized: usize,
    served: u64,
}

impl Sampler {
    /// Create a sampler; fails if no enabled stream has examples
    pub fn new(source: Arc<dyn ExampleSource>, config: SamplerConfig) -> Result<Self> {
        let metas: Vec<_> = (0..source.len()).map(|i| source.meta(i).clone()).collect();
        let planner = Planner::new(config.plan.clone(), &metas);
        let enabled = planner.enabled_regimes();
        if enabled.is_empty() {
            return Err(Error::Data(
                "no examples available in any stream with a positive oversampling weight".into(),
            ));
        }
        for regime in LabelRegime::ALL {
            if config.plan.weights[regime.index()] > 0.0 && !enabled.contains(&regime) {
                tracing::warn!(%regime, "stream has a positive weight but no examples");
            }
        }
        tracing::debug!(
            examples = source.len(),
            workers = config.workers,
            prefetch = config.prefetch_factor,
            "sampler ready"
        );
        Ok(Self {
            source,
            planner,
            config,
            position: SamplerPosition::default(),
            plan: None,
            prefetcher: None,
            skipped_oversized: 0,
            served: 0,
        })
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    /// Draws skipped so far because a single example exceeded the batch budget
    pub fn skipped_oversized(&self) -> usize {
        self.skipped_oversized
    }

    fn start_epoch(&mut self) -> Result<()> {
        let plan = self.planner.plan_epoch(self.position.epoch);
        if plan.batches.is_empty() {
            return Err(Error::Data(format!(
                "epoch {} has no batches: every example exceeds batch_max_length or was dropped",
                plan.epoch
            )));
        }
        if plan.skipped_oversized > 0 {
            tracing::warn!(
                epoch = plan.epoch,
                skipped = plan.skipped_oversized,
                batch_max_length = self.config.plan.batch_max_length,
                "skipped examples longer than batch_max_length"
            );
        }
        self.skipped_oversized += plan.skipped_oversized;
        tracing::info!(
            epoch = plan.epoch,
            batches = plan.batches.len(),
            dropped_partial = plan.dropped_partial,
            "planned epoch"
        );

        let start = self.position.batch.min(plan.batches.len());
        self.position.batch = start;
        if self.config.workers > 0 {
            self.prefetcher = Some(Prefetcher::spawn(
                Arc::clone(&self.source),
                plan.batches[start..].to_vec(),
                self.config.workers,
                self.config.prefetch_factor,
            ));
        }
        self.plan = Some(plan);
        Ok(())
    }

    fn finish_epoch(&mut self) -> Result<()> {
        self.prefetcher = None;
        self.plan = None;
        if !self.config.epoch_restart {
            return Err(Error::Exhausted { last_step: self.served });
        }
        self.position = SamplerPosition { epoch: self.position.epoch + 1, batch: 0 };
        Ok(())
    }
}

impl BatchSource for Sampler {
    fn next_batch(&mut self) -> Result<Batch> {
        loop {
            if self.plan.is_none() {
                self.start_epoch()?;
            }
            let Some(plan) = self.plan.as_ref() else { continue };
            let index = self.position.batch;
            let Some(planned) = plan.batches.get(index) else {
                self.finish_epoch()?;
                continue;
            };
            let bin = planned.bin;

            let examples = match self.prefetcher.as_mut() {
                Some(prefetcher) => match prefetcher.next() {
                    Some(loaded) => loaded?,
                    None => {
                        return Err(Error::Data("loader threads stopped before the epoch ended".into()))
                    }
                },
                None => prefetch::load_batch(self.source.as_ref(), &planned.indices)?,
            };

            self.position.batch += 1;
            self.served += 1;
            return Ok(Batch { examples, epoch: self.position.epoch, index, bin });
        }
    }

    fn position(&self) -> SamplerPosition {
        self.position
    }

    fn seek(&mut self, position: SamplerPosition) -> Result<()> {
        self.prefetcher = None;
        self.plan = None;
        self.position = position;
        Ok(())
    }
}
