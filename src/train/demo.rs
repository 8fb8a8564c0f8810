//! Small linear frame aligner and a loss-based evaluator
//!
//! The backbone is a single `tanh` projection of the frame features; the
//! head holds frame, boundary and CTC projections. Backward computes the
//! exact gradient of the frame cross-entropy (with label smoothing) and the
//! boundary binary cross-entropy, each scaled by its term's current
//! coefficient. The remaining terms are reported but not differentiated.

use super::loss::{CompositeLoss, LossOutput, LossTerm};
use super::model::{Evaluator, Metrics, ModelExecutor, Predictions};
use crate::config::{ModelSpec, TrainSpec};
use crate::data::{Batch, Example, ExampleSource, LabelRegime};
use crate::error::{Error, Result};
use crate::optim::{Gradients, GroupKind, Param};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

const BACKBONE_W: usize = 0;
const BACKBONE_B: usize = 1;
const FRAME_W: usize = 2;
const FRAME_B: usize = 3;
const EDGE_W: usize = 4;
const EDGE_B: usize = 5;
const CTC_W: usize = 6;
const CTC_B: usize = 7;

/// Linear aligner over fixed-size frame features
pub struct LinearAligner {
    feature_dim: usize,
    hidden: usize,
    classes: usize,
    label_smoothing: f32,
    params: Vec<Param>,
}

impl LinearAligner {
    pub fn new(feature_dim: usize, classes: usize, model: &ModelSpec, label_smoothing: f32, seed: u64) -> Self {
        let hidden = model.hidden_dims.max(1);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut init = |name: &str, group: GroupKind, fan_in: usize, len: usize| {
            let bound = 1.0 / (fan_in.max(1) as f32).sqrt();
            let data = Array1::from_shape_fn(len, |_| rng.random_range(-bound..bound));
            Param::new(name, group, data)
        };
        let params = vec![
            init("backbone.proj.weight", GroupKind::Backbone, feature_dim, hidden * feature_dim),
            Param::new("backbone.proj.bias", GroupKind::Backbone, Array1::zeros(hidden)),
            init("head.frame.weight", GroupKind::Head, hidden, classes * hidden),
            Param::new("head.frame.bias", GroupKind::Head, Array1::zeros(classes)),
            init("head.edge.weight", GroupKind::Head, hidden, hidden),
            Param::new("head.edge.bias", GroupKind::Head, Array1::zeros(1)),
            init("head.ctc.weight", GroupKind::Head, hidden, classes * hidden),
            Param::new("head.ctc.bias", GroupKind::Head, Array1::zeros(classes)),
        ];
        tracing::debug!(
            feature_dim,
            hidden,
            classes,
            down_sampling_factor = model.down_sampling_factor,
            down_sampling_times = model.down_sampling_times,
            "built linear aligner"
        );
        Self { feature_dim, hidden, classes, label_smoothing, params }
    }

    /// Aligner sized for a source and a run configuration
    pub fn for_source(source: &dyn ExampleSource, spec: &TrainSpec) -> Self {
        Self::new(
            source.feature_dim(),
            source.vocab_size(),
            &spec.model,
            spec.loss_config.function.label_smoothing,
            spec.random_seed,
        )
    }

    pub fn num_classes(&self) -> usize {
        self.classes
    }

    fn matrix(&self, index: usize, rows: usize, cols: usize) -> Result<ArrayView2<'_, f32>> {
        self.params[index]
            .data
            .view()
            .into_shape_with_order((rows, cols))
            .map_err(|e| Error::Model(format!("{}: {e}", self.params[index].name)))
    }

    /// Hidden activations, shape `(frames, hidden)`
    fn encode(&self, features: &Array2<f32>) -> Result<Array2<f32>> {
        if features.ncols() != self.feature_dim {
            return Err(Error::Model(format!(
                "expected {} feature dims, got {}",
                self.feature_dim,
                features.ncols()
            )));
        }
        let w = self.matrix(BACKBONE_W, self.hidden, self.feature_dim)?;
        let mut h = features.dot(&w.t());
        h += &self.params[BACKBONE_B].data;
        h.mapv_inplace(f32::tanh);
        Ok(h)
    }

    fn project(&self, h: &Array2<f32>, w: usize, b: usize, out: usize) -> Result<Array2<f32>> {
        let w = self.matrix(w, out, self.hidden)?;
        let mut y = h.dot(&w.t());
        y += &self.params[b].data;
        Ok(y)
    }
}

fn softmax_row(row: ArrayView1<'_, f32>) -> Array1<f32> {
    let max = row.fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exp = row.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    exp / sum
}

fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

impl ModelExecutor for LinearAligner {
    fn forward(&self, example: &Example) -> Result<Predictions> {
        let h = self.encode(&example.features)?;
        let frame_logits = self.project(&h, FRAME_W, FRAME_B, self.classes)?;
        let edge_logits = self.project(&h, EDGE_W, EDGE_B, 1)?.column(0).to_owned();
        let ctc_logits = self.project(&h, CTC_W, CTC_B, self.classes)?;
        let augmented_frame_logits = match &example.augmented {
            Some(features) => Some(self.project(&self.encode(features)?, FRAME_W, FRAME_B, self.classes)?),
            None => None,
        };
        Ok(Predictions { frame_logits, edge_logits, ctc_logits, augmented_frame_logits })
    }

    fn backward(&self, batch: &Batch, predictions: &[Predictions], loss: &LossOutput) -> Result<Gradients> {
        if batch.len() != predictions.len() {
            return Err(Error::Model("prediction count does not match batch".into()));
        }
        let frame_term = loss.term(LossTerm::FrameGhm);
        let edge_term = loss.term(LossTerm::EdgeGhm);
        let frame_coef = frame_term.coefficient() as f32 / frame_term.examples.max(1) as f32;
        let edge_coef = edge_term.coefficient() as f32 / edge_term.examples.max(1) as f32;

        let mut grads = Gradients::zeros_like(&self.params);
        let frame_w = self.matrix(FRAME_W, self.classes, self.hidden)?;
        let edge_w = &self.params[EDGE_W].data;
        let smoothing = self.label_smoothing;
        let uniform = smoothing / self.classes as f32;

        for (example, preds) in batch.examples.iter().zip(predictions) {
            if example.regime() != LabelRegime::Full {
                continue;
            }
            let frames = preds.num_frames();
            if frames == 0 {
                continue;
            }
            let scale = 1.0 / frames as f32;

            let mut d_frame = Array2::<f32>::zeros((frames, self.classes));
            if let Some(labels) = &example.frame_labels {
                for (f, &label) in labels.iter().enumerate().take(frames) {
                    let p = softmax_row(preds.frame_logits.row(f));
                    let mut row = d_frame.row_mut(f);
                    for c in 0..self.classes {
                        let target = if c == label { 1.0 - smoothing + uniform } else { uniform };
                        row[c] = (p[c] - target) * scale * frame_coef;
                    }
                }
            }
            let mut d_edge = Array1::<f32>::zeros(frames);
            if let Some(edges) = &example.edges {
                for (f, &t) in edges.iter().enumerate().take(frames) {
                    d_edge[f] = (sigmoid(preds.edge_logits[f]) - t) * scale * edge_coef;
                }
            }

            let h = self.encode(&example.features)?;
            add_linear_grads(&mut grads, FRAME_W, FRAME_B, &d_frame, &h);
            let d_edge_col = d_edge.view().insert_axis(Axis(1));
            add_linear_grads(&mut grads, EDGE_W, EDGE_B, &d_edge_col.to_owned(), &h);

            // Back through the heads and the tanh
            let mut d_h = d_frame.dot(&frame_w);
            for (mut row, &de) in d_h.rows_mut().into_iter().zip(d_edge.iter()) {
                row.scaled_add(de, edge_w);
            }
            let d_z = d_h * h.mapv(|v| 1.0 - v * v);
            add_linear_grads(&mut grads, BACKBONE_W, BACKBONE_B, &d_z, &example.features);
        }
        Ok(grads)
    }

    fn params(&self) -> &[Param] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [Param] {
        &mut self.params
    }
}

/// Accumulate `dW += dyᵀ x` and `db += Σ dy` for a linear layer `y = x Wᵀ + b`
fn add_linear_grads(grads: &mut Gradients, w: usize, b: usize, dy: &Array2<f32>, x: &Array2<f32>) {
    let dw = dy.t().dot(x);
    if let Some(g) = grads.get_mut(w) {
        let flat = dw.iter().copied().collect::<Array1<f32>>();
        *g += &flat;
    }
    if let Some(g) = grads.get_mut(b) {
        *g += &dy.sum_axis(Axis(0));
    }
}

/// Mean validation loss and frame accuracy over a held-out source
pub struct LossEvaluator {
    source: Arc<dyn ExampleSource>,
    max_examples: usize,
}

impl LossEvaluator {
    pub fn new(source: Arc<dyn ExampleSource>) -> Self {
        Self { source, max_examples: 64 }
    }

    pub fn with_max_examples(mut self, max_examples: usize) -> Self {
        self.max_examples = max_examples.max(1);
        self
    }
}

impl Evaluator for LossEvaluator {
    fn evaluate(&mut self, model: &dyn ModelExecutor, loss: &CompositeLoss, step: u64) -> Result<Metrics> {
        let count = self.source.len().min(self.max_examples);
        let mut metrics = Metrics::new();
        if count == 0 {
            return Ok(metrics);
        }

        let mut total = 0.0;
        let mut correct = 0usize;
        let mut labelled = 0usize;
        for index in 0..count {
            let example = self.source.load(index)?;
            let preds = model.forward(&example)?;
            if let Some(labels) = &example.frame_labels {
                for (row, &label) in preds.frame_logits.rows().into_iter().zip(labels) {
                    let predicted = row
                        .iter()
                        .enumerate()
                        .fold((0, f32::NEG_INFINITY), |best, (c, &v)| if v > best.1 { (c, v) } else { best })
                        .0;
                    correct += usize::from(predicted == label);
                    labelled += 1;
                }
            }
            let batch = Batch { examples: vec![example], epoch: 0, index, bin: 0 };
            total += loss.evaluate(&batch, std::slice::from_ref(&preds), step)?.total;
        }

        metrics.insert("valid/loss".into(), total / count as f64);
        if labelled > 0 {
            metrics.insert("valid/frame_accuracy".into(), correct as f64 / labelled as f64);
        }
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_spec;
    use crate::data::{SyntheticConfig, SyntheticSource};
    use crate::precision::Precision;
    use crate::train::ramp::RampScheduler;

    fn small_model() -> ModelSpec {
        ModelSpec { hidden_dims: 8, down_sampling_factor: 3, down_sampling_times: 7, channels_scaleup_factor: 1.5 }
    }

    fn source() -> SyntheticSource {
        SyntheticSource::new(SyntheticConfig { num_examples: 24, ..SyntheticConfig::default() })
    }

    fn supervised_loss() -> CompositeLoss {
        let spec = default_spec();
        CompositeLoss::new(
            &[1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            RampScheduler::always_on(7),
            spec.loss_config.function,
            Precision::Fp32,
        )
        .unwrap()
    }

    fn full_batch(src: &SyntheticSource) -> Batch {
        let examples = (0..src.len())
            .map(|i| src.load(i).unwrap())
            .filter(|e| e.regime() == LabelRegime::Full)
            .take(2)
            .collect();
        Batch { examples, epoch: 0, index: 0, bin: 0 }
    }

    #[test]
    fn test_forward_shapes() {
        let src = source();
        let model = LinearAligner::new(src.feature_dim(), src.vocab_size(), &small_model(), 0.08, 1);
        let example = src.load(0).unwrap();
        let preds = model.forward(&example).unwrap();
        assert_eq!(preds.frame_logits.dim(), (example.num_frames(), src.vocab_size()));
        assert_eq!(preds.edge_logits.len(), example.num_frames());
        assert_eq!(preds.ctc_logits.ncols(), src.vocab_size());
    }

    #[test]
    fn test_backward_matches_parameter_shapes() {
        let src = source();
        let model = LinearAligner::new(src.feature_dim(), src.vocab_size(), &small_model(), 0.08, 1);
        let batch = full_batch(&src);
        let preds = model.forward_batch(&batch).unwrap();
        let mut loss = supervised_loss();
        let out = loss.compute_batch(&batch, &preds, 0).unwrap();
        let grads = model.backward(&batch, &preds, &out).unwrap();
        assert!(grads.matches(model.params()));
        assert!(grads.is_finite());
        assert!(grads.as_slice().iter().any(|g| g.iter().any(|&v| v != 0.0)));
    }

    #[test]
    fn test_gradient_step_lowers_supervised_loss() {
        let src = source();
        let mut model = LinearAligner::new(src.feature_dim(), src.vocab_size(), &small_model(), 0.08, 3);
        let batch = full_batch(&src);
        let loss = supervised_loss();

        let preds = model.forward_batch(&batch).unwrap();
        let before = loss.evaluate(&batch, &preds, 0).unwrap();
        let grads = model.backward(&batch, &preds, &before).unwrap();
        for (param, grad) in model.params_mut().iter_mut().zip(grads.as_slice()) {
            param.data.scaled_add(-0.05, grad);
        }
        let after = loss.evaluate(&batch, &model.forward_batch(&batch).unwrap(), 0).unwrap();
        assert!(after.total < before.total, "{} !< {}", after.total, before.total);
    }

    #[test]
    fn test_load_params_checks_shapes() {
        let mut a = LinearAligner::new(4, 5, &small_model(), 0.0, 1);
        let b = LinearAligner::new(4, 5, &small_model(), 0.0, 2);
        a.load_params(b.params()).unwrap();
        assert_eq!(a.params(), b.params());
        let c = LinearAligner::new(4, 6, &small_model(), 0.0, 2);
        assert!(a.load_params(c.params()).is_err());
    }

    #[test]
    fn test_evaluator_reports_loss_and_accuracy() {
        let src: Arc<dyn ExampleSource> = Arc::new(source());
        let model = LinearAligner::new(src.feature_dim(), src.vocab_size(), &small_model(), 0.08, 1);
        let mut evaluator = LossEvaluator::new(Arc::clone(&src)).with_max_examples(4);
        let metrics = evaluator.evaluate(&model, &supervised_loss(), 0).unwrap();
        assert!(metrics["valid/loss"].is_finite());
        if let Some(acc) = metrics.get("valid/frame_accuracy") {
            assert!((0.0..=1.0).contains(acc));
        }
    }
}
