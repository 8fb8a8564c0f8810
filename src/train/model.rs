//! Model execution and evaluation seams
//!
//! The trainer never looks inside a network. It calls a [`ModelExecutor`]
//! for forward and backward passes and an [`Evaluator`] at validation time.

use super::loss::{CompositeLoss, LossOutput};
use crate::data::{Batch, Example};
use crate::error::{Error, Result};
use crate::optim::{Gradients, Param};
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;

/// Network outputs for one example
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    /// Frame classification logits, shape `(frames, classes)`
    pub frame_logits: Array2<f32>,
    /// Boundary logits, one per frame
    pub edge_logits: Array1<f32>,
    /// CTC logits, shape `(frames, vocab)`; column 0 is blank
    pub ctc_logits: Array2<f32>,
    /// Frame logits for the augmented input, when the example has one
    pub augmented_frame_logits: Option<Array2<f32>>,
}

impl Predictions {
    pub fn num_frames(&self) -> usize {
        self.frame_logits.nrows()
    }
}

/// Supervision available for one example, borrowed from it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Targets<'a> {
    pub frame_labels: Option<&'a [usize]>,
    pub edges: Option<&'a [f32]>,
    pub phonemes: &'a [usize],
}

impl<'a> Targets<'a> {
    pub fn from_example(example: &'a Example) -> Self {
        Self {
            frame_labels: example.frame_labels.as_deref(),
            edges: example.edges.as_deref(),
            phonemes: &example.phonemes,
        }
    }
}

/// Validation metrics by name
pub type Metrics = BTreeMap<String, f64>;

/// Runs the network
///
/// Architecture construction (`hidden_dims`, `down_sampling_factor`,
/// `down_sampling_times`, `channels_scaleup_factor`) happens in the
/// implementor's constructor.
pub trait ModelExecutor: Send {
    /// Forward pass for one example
    fn forward(&self, example: &Example) -> Result<Predictions>;

    /// Gradients of the batch loss with respect to [`ModelExecutor::params`]
    fn backward(&self, batch: &Batch, predictions: &[Predictions], loss: &LossOutput) -> Result<Gradients>;

    /// Parameters in a fixed order
    fn params(&self) -> &[Param];

    fn params_mut(&mut self) -> &mut [Param];

    /// Forward pass for every example of a batch
    fn forward_batch(&self, batch: &Batch) -> Result<Vec<Predictions>> {
        batch.examples.iter().map(|e| self.forward(e)).collect()
    }

    /// Replace parameter values, checking names and shapes
    fn load_params(&mut self, params: &[Param]) -> Result<()> {
        let own = self.params_mut();
        if own.len() != params.len() {
            return Err(Error::Model(format!(
                "expected {} parameters, got {}",
                own.len(),
                params.len()
            )));
        }
        for (dst, src) in own.iter_mut().zip(params) {
            if dst.name != src.name || dst.len() != src.len() {
                return Err(Error::Model(format!(
                    "parameter mismatch: {} [{}] vs {} [{}]",
                    dst.name,
                    dst.len(),
                    src.name,
                    src.len()
                )));
            }
            dst.data.assign(&src.data);
        }
        Ok(())
    }
}

/// Computes validation metrics; results are only logged
pub trait Evaluator {
    fn evaluate(&mut self, model: &dyn ModelExecutor, loss: &CompositeLoss, step: u64) -> Result<Metrics>;
}
