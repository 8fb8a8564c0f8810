//! Epoch planning: weighted stream draws, duration binning, batch packing
//!
//! Planning only looks at example metadata and runs on the caller's thread,
//! so batch composition is fixed before any worker loads a payload.

use crate::data::example::{ExampleMeta, LabelRegime};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Planner settings
#[derive(Debug, Clone, PartialEq)]
pub struct PlanConfig {
    /// Draw weights in `LabelRegime::ALL` order
    pub weights: [f64; 3],
    /// Upper bound on the summed duration of a batch
    pub batch_max_length: f64,
    pub binning_length: f64,
    pub drop_last: bool,
    pub seed: u64,
}

/// A batch decided by the planner, before loading
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedBatch {
    pub bin: u64,
    /// Source indices in draw order
    pub indices: Vec<usize>,
    pub duration: f64,
}

/// Every batch of one epoch, in consumption order
#[derive(Debug, Clone, PartialEq)]
pub struct EpochPlan {
    pub epoch: u64,
    pub batches: Vec<PlannedBatch>,
    /// Draws discarded because the example alone exceeds the batch budget
    pub skipped_oversized: usize,
    /// Trailing partial batches discarded by `drop_last`
    pub dropped_partial: usize,
}

/// Shuffled, cycling view of one regime's examples
struct Stream {
    indices: Vec<usize>,
    cursor: usize,
}

impl Stream {
    fn next(&mut self, rng: &mut StdRng) -> usize {
        if self.cursor == self.indices.len() {
            self.indices.shuffle(rng);
            self.cursor = 0;
        }
        let index = self.indices[self.cursor];
        self.cursor += 1;
        index
    }
}

/// Deterministic batch planner
#[derive(Debug, Clone)]
pub struct Planner {
    config: PlanConfig,
    durations: Vec<f64>,
    /// Example indices per regime
    streams: [Vec<usize>; 3],
}

impl Planner {
    pub fn new(config: PlanConfig, metas: &[ExampleMeta]) -> Self {
        let mut streams: [Vec<usize>; 3] = Default::default();
        for (i, meta) in metas.iter().enumerate() {
            streams[meta.regime.index()].push(i);
        }
        let durations = metas.iter().map(|m| m.duration).collect();
        Self { config, durations, streams }
    }

    /// Regimes that can be drawn from: positive weight and at least one example
    pub fn enabled_regimes(&self) -> Vec<LabelRegime> {
        LabelRegime::ALL
            .into_iter()
            .filter(|r| self.config.weights[r.index()] > 0.0 && !self.streams[r.index()].is_empty())
            .collect()
    }

    /// Draws per epoch: the number of examples in enabled streams
    pub fn draws_per_epoch(&self) -> usize {
        self.enabled_regimes().iter().map(|r| self.streams[r.index()].len()).sum()
    }

    /// Bin of a duration
    pub fn bin_of(&self, duration: f64) -> u64 {
        (duration / self.config.binning_length).floor() as u64
    }

    /// Plan epoch `epoch`; identical inputs give identical plans
    pub fn plan_epoch(&self, epoch: u64) -> EpochPlan {
        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(epoch));
        let enabled = self.enabled_regimes();

        let mut streams: Vec<(f64, Stream)> = enabled
            .iter()
            .map(|r| {
                let mut indices = self.streams[r.index()].clone();
                indices.shuffle(&mut rng);
                (self.config.weights[r.index()], Stream { indices, cursor: 0 })
            })
            .collect();
        let total_weight: f64 = streams.iter().map(|(w, _)| w).sum();

        // Weighted draws, grouped by bin in draw order
        let mut bins: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
        for _ in 0..self.draws_per_epoch() {
            let mut target = rng.random::<f64>() * total_weight;
            let mut chosen = streams.len() - 1;
            for (s, (weight, _)) in streams.iter().enumerate() {
                if target < *weight {
                    chosen = s;
                    break;
                }
                target -= weight;
            }
            let index = streams[chosen].1.next(&mut rng);
            bins.entry(self.bin_of(self.durations[index])).or_default().push(index);
        }

        let mut batches = Vec::new();
        let mut skipped_oversized = 0;
        let mut dropped_partial = 0;
        let max = self.config.batch_max_length;

        for (bin, members) in bins {
            let mut current = Vec::new();
            let mut current_duration = 0.0;
            for index in members {
                let duration = self.durations[index];
                if duration > max {
                    skipped_oversized += 1;
                    continue;
                }
                if !current.is_empty() && current_duration + duration > max {
                    batches.push(PlannedBatch {
                        bin,
                        indices: std::mem::take(&mut current),
                        duration: current_duration,
                    });
                    current_duration = 0.0;
                }
                current.push(index);
                current_duration += duration;
            }
            if !current.is_empty() {
                if self.config.drop_last {
                    dropped_partial += 1;
                } else {
                    batches.push(PlannedBatch { bin, indices: current, duration: current_duration });
                }
            }
        }

        batches.shuffle(&mut rng);
        EpochPlan { epoch, batches, skipped_oversized, dropped_partial }
    }
}
