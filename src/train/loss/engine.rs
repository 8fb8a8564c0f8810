//! Composite loss evaluation

use super::functional::{log_softmax_rows, quantize1, quantize2};
use super::ghm::{GhmHistogram, GhmState, GhmWeighter};
use super::{terms, LossOutput, LossTerm, TermValue};
use crate::config::{LossFunctionSpec, TrainSpec, NUM_LOSS_TERMS};
use crate::data::{Batch, LabelRegime};
use crate::error::{Error, Result};
use crate::precision::Precision;
use crate::train::model::{Predictions, Targets};
use crate::train::ramp::RampScheduler;
use serde::{Deserialize, Serialize};

const NUM_GHM_TERMS: usize = 3;

/// Persistent loss statistics (GHM densities) for checkpointing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossState {
    pub ghm: Vec<GhmState>,
}

/// Weighted, gated sum of the seven loss terms
///
/// The GHM densities are the only mutable state; [`CompositeLoss::compute`]
/// and [`CompositeLoss::compute_batch`] fold each call's histogram into
/// them, [`CompositeLoss::evaluate`] leaves them alone.
#[derive(Debug, Clone)]
pub struct CompositeLoss {
    weights: [f32; NUM_LOSS_TERMS],
    ramp: RampScheduler,
    function: LossFunctionSpec,
    precision: Precision,
    ghm: [GhmWeighter; NUM_GHM_TERMS],
}

struct Sample<'a> {
    predictions: &'a Predictions,
    targets: Targets<'a>,
    regime: LabelRegime,
}

#[derive(Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    examples: usize,
}

impl CompositeLoss {
    pub fn new(
        weights: &[f32],
        ramp: RampScheduler,
        function: LossFunctionSpec,
        precision: Precision,
    ) -> Result<Self> {
        let weights: [f32; NUM_LOSS_TERMS] = weights.try_into().map_err(|_| {
            Error::Config(format!(
                "expected {NUM_LOSS_TERMS} loss weights, got {}",
                weights.len()
            ))
        })?;
        if ramp.num_terms() != NUM_LOSS_TERMS {
            return Err(Error::Config(format!(
                "expected {NUM_LOSS_TERMS} ramp flags, got {}",
                ramp.num_terms()
            )));
        }
        let ghm = std::array::from_fn(|_| GhmWeighter::new(function.num_bins, function.alpha));
        Ok(Self { weights, ramp, function, precision, ghm })
    }

    pub fn from_spec(spec: &TrainSpec) -> Result<Self> {
        Self::new(
            &spec.loss_config.losses.weights,
            RampScheduler::from_spec(spec),
            spec.loss_config.function,
            spec.precision,
        )
    }

    pub fn weights(&self) -> &[f32; NUM_LOSS_TERMS] {
        &self.weights
    }

    pub fn ramp(&self) -> &RampScheduler {
        &self.ramp
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Loss for a single example, updating GHM statistics
    pub fn compute(
        &mut self,
        predictions: &Predictions,
        targets: Targets<'_>,
        regime: LabelRegime,
        step: u64,
    ) -> Result<LossOutput> {
        let samples = [Sample { predictions, targets, regime }];
        let mut hist = self.new_histograms();
        let out = self.accumulate(&samples, step, &mut hist)?;
        self.update_ghm(&hist);
        Ok(out)
    }

    /// Loss for a batch, updating GHM statistics once for the whole batch
    ///
    /// Each raw term is the mean over the examples it applies to.
    pub fn compute_batch(&mut self, batch: &Batch, predictions: &[Predictions], step: u64) -> Result<LossOutput> {
        let samples = Self::samples(batch, predictions)?;
        let mut hist = self.new_histograms();
        let out = self.accumulate(&samples, step, &mut hist)?;
        self.update_ghm(&hist);
        Ok(out)
    }

    /// Batch loss without touching GHM statistics (validation)
    pub fn evaluate(&self, batch: &Batch, predictions: &[Predictions], step: u64) -> Result<LossOutput> {
        let samples = Self::samples(batch, predictions)?;
        let mut hist = self.new_histograms();
        self.accumulate(&samples, step, &mut hist)
    }

    pub fn state(&self) -> LossState {
        LossState { ghm: self.ghm.iter().map(GhmWeighter::state).collect() }
    }

    /// Restore GHM densities; densities saved with a different bin count
    /// are discarded with a warning
    pub fn load(&mut self, state: &LossState) {
        for (weighter, saved) in self.ghm.iter_mut().zip(&state.ghm) {
            if !weighter.load(saved) {
                tracing::warn!(
                    saved_bins = saved.density.len(),
                    bins = weighter.num_bins(),
                    "GHM density bin count changed, keeping fresh density"
                );
            }
        }
    }

    fn samples<'a>(batch: &'a Batch, predictions: &'a [Predictions]) -> Result<Vec<Sample<'a>>> {
        if batch.len() != predictions.len() {
            return Err(Error::Model(format!(
                "{} predictions for a batch of {}",
                predictions.len(),
                batch.len()
            )));
        }
        Ok(batch
            .examples
            .iter()
            .zip(predictions)
            .map(|(example, predictions)| Sample {
                predictions,
                targets: Targets::from_example(example),
                regime: example.regime(),
            })
            .collect())
    }

    fn new_histograms(&self) -> [GhmHistogram; NUM_GHM_TERMS] {
        std::array::from_fn(|i| GhmHistogram::new(self.ghm[i].num_bins()))
    }

    fn update_ghm(&mut self, hist: &[GhmHistogram; NUM_GHM_TERMS]) {
        for (weighter, h) in self.ghm.iter_mut().zip(hist) {
            weighter.update(h);
        }
    }

    /// Density and histogram of a GHM-weighted term
    fn ghm_for<'h>(
        &self,
        term: LossTerm,
        hist: &'h mut [GhmHistogram; NUM_GHM_TERMS],
    ) -> Result<(&GhmWeighter, &'h mut GhmHistogram)> {
        let slot = term
            .ghm_slot()
            .ok_or_else(|| Error::Model(format!("{term} is not GHM-weighted")))?;
        Ok((&self.ghm[slot], &mut hist[slot]))
    }

    fn accumulate(
        &self,
        samples: &[Sample<'_>],
        step: u64,
        hist: &mut [GhmHistogram; NUM_GHM_TERMS],
    ) -> Result<LossOutput> {
        let mut acc = [Accumulator::default(); NUM_LOSS_TERMS];
        for sample in samples {
            let raws = self.raw_terms(sample, hist)?;
            for (a, raw) in acc.iter_mut().zip(raws) {
                if let Some(v) = raw {
                    a.sum += v;
                    a.examples += 1;
                }
            }
        }

        let breakdown: Vec<TermValue> = LossTerm::ALL
            .iter()
            .zip(acc)
            .map(|(&term, a)| {
                let raw = if a.examples > 0 { a.sum / a.examples as f64 } else { 0.0 };
                let weight = self.weights[term.index()];
                let gate = self.ramp.gate(term.index(), step);
                let coefficient = f64::from(weight) * f64::from(gate);
                let weighted = if coefficient == 0.0 { 0.0 } else { coefficient * raw };
                TermValue { term, raw, weight, gate, weighted, examples: a.examples }
            })
            .collect();
        let total = breakdown.iter().map(|t| t.weighted).sum();
        Ok(LossOutput { total, breakdown })
    }

    fn raw_terms(
        &self,
        sample: &Sample<'_>,
        hist: &mut [GhmHistogram; NUM_GHM_TERMS],
    ) -> Result<[Option<f64>; NUM_LOSS_TERMS]> {
        let preds = sample.predictions;
        let frames = preds.num_frames();
        if preds.edge_logits.len() != frames {
            return Err(Error::Model(format!(
                "edge logits cover {} frames, frame logits {frames}",
                preds.edge_logits.len()
            )));
        }

        let frame_lp = log_softmax_rows(&quantize2(preds.frame_logits.view(), self.precision));
        let augmented_lp = preds
            .augmented_frame_logits
            .as_ref()
            .map(|a| log_softmax_rows(&quantize2(a.view(), self.precision)));
        let edge_logits = quantize1(preds.edge_logits.view(), self.precision);
        let smoothing = f64::from(self.function.label_smoothing);
        let ratio = f64::from(self.function.pseudo_label_ratio);

        let mut raw = [None; NUM_LOSS_TERMS];
        for term in LossTerm::ALL {
            if !term.applies_to(sample.regime) {
                continue;
            }
            let targets = &sample.targets;
            raw[term.index()] = match term {
                LossTerm::FrameGhm => match targets.frame_labels {
                    Some(labels) => {
                        let (ghm, h) = self.ghm_for(term, hist)?;
                        terms::frame_ghm(&frame_lp, labels, smoothing, ghm, h)?
                    }
                    None => None,
                },
                LossTerm::EdgeGhm => match targets.edges {
                    Some(edges) => {
                        let (ghm, h) = self.ghm_for(term, hist)?;
                        terms::edge_ghm(&edge_logits, edges, ghm, h)?
                    }
                    None => None,
                },
                LossTerm::EdgeEmd => match targets.edges {
                    Some(edges) => terms::edge_emd(&edge_logits, edges)?,
                    None => None,
                },
                LossTerm::EdgeDiffGhm => match targets.edges {
                    Some(edges) => {
                        let (ghm, h) = self.ghm_for(term, hist)?;
                        terms::edge_diff_ghm(&edge_logits, edges, ghm, h)?
                    }
                    None => None,
                },
                LossTerm::Ctc => {
                    let ctc_logits = quantize2(preds.ctc_logits.view(), self.precision);
                    let v = terms::ctc(&ctc_logits, targets.phonemes)?;
                    if v.is_none() {
                        tracing::debug!(
                            frames = ctc_logits.nrows(),
                            symbols = targets.phonemes.len(),
                            "no CTC alignment, term skipped for example"
                        );
                    }
                    v
                }
                LossTerm::Consistency => terms::consistency(&frame_lp, augmented_lp.as_ref())?,
                LossTerm::PseudoLabel => terms::pseudo_label(&frame_lp, augmented_lp.as_ref(), ratio)?,
            };
        }
        Ok(raw)
    }
}
