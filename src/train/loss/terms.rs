//! Raw values of the seven loss terms for a single example
//!
//! Each function returns `Ok(None)` when the term does not apply to the
//! example (missing payload, nothing to supervise) and an error when the
//! predictions and targets disagree in shape.

use super::ctc::ctc_nll;
use super::functional::{argmax, bce_with_logits, log_softmax_rows, sigmoid, smoothed_cross_entropy};
use super::ghm::{weighted_mean, GhmHistogram, GhmWeighter};
use crate::error::{Error, Result};
use ndarray::{Array1, Array2};

fn check_frames(what: &str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(Error::Model(format!("{what}: expected {expected} frames, got {got}")));
    }
    Ok(())
}

/// Label-smoothed frame cross-entropy, GHM-weighted by `1 - p(label)`
pub(crate) fn frame_ghm(
    frame_lp: &Array2<f64>,
    labels: &[usize],
    smoothing: f64,
    ghm: &GhmWeighter,
    hist: &mut GhmHistogram,
) -> Result<Option<f64>> {
    check_frames("frame labels", frame_lp.nrows(), labels.len())?;
    if labels.is_empty() {
        return Ok(None);
    }
    let classes = frame_lp.ncols();
    let mut losses = Vec::with_capacity(labels.len());
    let mut magnitudes = Vec::with_capacity(labels.len());
    for (row, &label) in frame_lp.rows().into_iter().zip(labels) {
        if label >= classes {
            return Err(Error::Data(format!("frame label {label} outside {classes} classes")));
        }
        losses.push(smoothed_cross_entropy(row, label, smoothing));
        magnitudes.push(1.0 - row[label].exp());
    }
    let weights = ghm.weights(&magnitudes, hist);
    Ok(Some(weighted_mean(&losses, &weights)))
}

/// Boundary binary cross-entropy, GHM-weighted by `|σ(x) - t|`
pub(crate) fn edge_ghm(
    edge_logits: &Array1<f64>,
    edges: &[f32],
    ghm: &GhmWeighter,
    hist: &mut GhmHistogram,
) -> Result<Option<f64>> {
    check_frames("edge targets", edge_logits.len(), edges.len())?;
    if edges.is_empty() {
        return Ok(None);
    }
    let (losses, magnitudes): (Vec<f64>, Vec<f64>) = edge_logits
        .iter()
        .zip(edges)
        .map(|(&x, &t)| {
            let t = f64::from(t);
            (bce_with_logits(x, t), (sigmoid(x) - t).abs())
        })
        .unzip();
    let weights = ghm.weights(&magnitudes, hist);
    Ok(Some(weighted_mean(&losses, &weights)))
}

/// Earth mover's distance between cumulative boundary mass
///
/// `Σ_f |P(f) - T(f)| / frames²` with `P`, `T` the running sums of boundary
/// probabilities and targets.
pub(crate) fn edge_emd(edge_logits: &Array1<f64>, edges: &[f32]) -> Result<Option<f64>> {
    check_frames("edge targets", edge_logits.len(), edges.len())?;
    if edges.is_empty() {
        return Ok(None);
    }
    let mut cum_p = 0.0;
    let mut cum_t = 0.0;
    let mut distance = 0.0;
    for (&x, &t) in edge_logits.iter().zip(edges) {
        cum_p += sigmoid(x);
        cum_t += f64::from(t);
        distance += (cum_p - cum_t).abs();
    }
    let n = edges.len() as f64;
    Ok(Some(distance / (n * n)))
}

/// Squared error between first differences of boundary probabilities and
/// targets, GHM-weighted by half the absolute difference
pub(crate) fn edge_diff_ghm(
    edge_logits: &Array1<f64>,
    edges: &[f32],
    ghm: &GhmWeighter,
    hist: &mut GhmHistogram,
) -> Result<Option<f64>> {
    check_frames("edge targets", edge_logits.len(), edges.len())?;
    if edges.len() < 2 {
        return Ok(None);
    }
    let probs: Vec<f64> = edge_logits.iter().map(|&x| sigmoid(x)).collect();
    let (losses, magnitudes): (Vec<f64>, Vec<f64>) = probs
        .windows(2)
        .zip(edges.windows(2))
        .map(|(p, t)| {
            let diff = (p[1] - p[0]) - f64::from(t[1] - t[0]);
            (diff * diff, diff.abs() / 2.0)
        })
        .unzip();
    let weights = ghm.weights(&magnitudes, hist);
    Ok(Some(weighted_mean(&losses, &weights)))
}

/// CTC negative log-likelihood per target symbol
pub(crate) fn ctc(ctc_logits: &Array2<f64>, phonemes: &[usize]) -> Result<Option<f64>> {
    if ctc_logits.nrows() == 0 {
        return Ok(None);
    }
    let lp = log_softmax_rows(ctc_logits);
    Ok(ctc_nll(&lp, phonemes).map(|nll| nll / phonemes.len().max(1) as f64))
}

/// Mean per-frame KL divergence from original to augmented predictions
pub(crate) fn consistency(frame_lp: &Array2<f64>, augmented_lp: Option<&Array2<f64>>) -> Result<Option<f64>> {
    let Some(aug) = augmented_lp else {
        return Ok(None);
    };
    if aug.dim() != frame_lp.dim() {
        return Err(Error::Model(format!(
            "augmented logits shape {:?} differs from {:?}",
            aug.dim(),
            frame_lp.dim()
        )));
    }
    if frame_lp.nrows() == 0 {
        return Ok(None);
    }
    let total: f64 = frame_lp
        .iter()
        .zip(aug.iter())
        .map(|(&p, &q)| p.exp() * (p - q))
        .sum();
    Ok(Some(total / frame_lp.nrows() as f64))
}

/// Cross-entropy against hard pseudo-labels from the most confident frames
///
/// The top `ratio` fraction of frames by max probability is selected; the
/// augmented predictions are the student when present.
pub(crate) fn pseudo_label(
    frame_lp: &Array2<f64>,
    augmented_lp: Option<&Array2<f64>>,
    ratio: f64,
) -> Result<Option<f64>> {
    let frames = frame_lp.nrows();
    let keep = (ratio * frames as f64).floor() as usize;
    if keep == 0 {
        return Ok(None);
    }
    let student = augmented_lp.unwrap_or(frame_lp);
    if student.dim() != frame_lp.dim() {
        return Err(Error::Model("augmented logits shape differs from frame logits".into()));
    }

    let mut ranked: Vec<(usize, usize, f64)> = frame_lp
        .rows()
        .into_iter()
        .enumerate()
        .map(|(f, row)| {
            let (label, confidence) = argmax(row);
            (f, label, confidence)
        })
        .collect();
    ranked.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)));

    let loss: f64 = ranked
        .iter()
        .take(keep)
        .map(|&(f, label, _)| -student[[f, label]])
        .sum();
    Ok(Some(loss / keep as f64))
}
