//! Numerically stable building blocks shared by the loss terms
//!
//! Inputs arrive as f32 logits already rounded to the compute precision;
//! everything here works in f64.

use crate::precision::Precision;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Round logits to the compute precision and widen to f64
pub(crate) fn quantize2(logits: ArrayView2<'_, f32>, precision: Precision) -> Array2<f64> {
    logits.mapv(|v| f64::from(precision.quantize(v)))
}

pub(crate) fn quantize1(logits: ArrayView1<'_, f32>, precision: Precision) -> Array1<f64> {
    logits.mapv(|v| f64::from(precision.quantize(v)))
}

/// Stable sigmoid: σ(x) = 1 / (1 + exp(-x))
pub(crate) fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Binary cross-entropy on a logit: `max(x, 0) - x*t + log(1 + exp(-|x|))`
pub(crate) fn bce_with_logits(x: f64, t: f64) -> f64 {
    x.max(0.0) - x * t + (-x.abs()).exp().ln_1p()
}

/// Row-wise log-softmax with max subtraction
pub(crate) fn log_softmax_rows(logits: &Array2<f64>) -> Array2<f64> {
    let mut out = logits.clone();
    for mut row in out.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let log_sum = row.iter().map(|&v| (v - max).exp()).sum::<f64>().ln() + max;
        row.mapv_inplace(|v| v - log_sum);
    }
    out
}

/// Index and value of the largest element
pub(crate) fn argmax(row: ArrayView1<'_, f64>) -> (usize, f64) {
    row.iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
}

/// Cross-entropy against a label-smoothed one-hot target, given log-probabilities
///
/// The target puts `1 - ε + ε/C` on the label and `ε/C` elsewhere.
pub(crate) fn smoothed_cross_entropy(log_probs: ArrayView1<'_, f64>, label: usize, smoothing: f64) -> f64 {
    let classes = log_probs.len() as f64;
    let uniform = -log_probs.sum() / classes;
    let nll = -log_probs[label];
    (1.0 - smoothing) * nll + smoothing * uniform
}

/// Log of `exp(a) + exp(b)` without overflow
pub(crate) fn log_add_exp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let max = a.max(b);
    max + ((a - max).exp() + (b - max).exp()).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_sigmoid_symmetry() {
        assert_abs_diff_eq!(sigmoid(0.0), 0.5);
        assert_abs_diff_eq!(sigmoid(3.0) + sigmoid(-3.0), 1.0, epsilon = 1e-12);
        assert!(sigmoid(-1000.0).is_finite());
    }

    #[test]
    fn test_bce_matches_naive_formula() {
        let x = 0.7;
        let t = 1.0;
        let naive = -(t * sigmoid(x).ln() + (1.0 - t) * (1.0 - sigmoid(x)).ln());
        assert_abs_diff_eq!(bce_with_logits(x, t), naive, epsilon = 1e-12);
        assert!(bce_with_logits(500.0, 0.0).is_finite());
    }

    #[test]
    fn test_log_softmax_rows_normalise() {
        let logits = array![[1.0, 2.0, 3.0], [1000.0, 0.0, -1000.0]];
        let lp = log_softmax_rows(&logits);
        for row in lp.rows() {
            let total: f64 = row.iter().map(|v| v.exp()).sum();
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_smoothed_ce_without_smoothing_is_nll() {
        let lp = log_softmax_rows(&array![[0.5, 1.5, -0.5]]);
        let row = lp.row(0);
        assert_abs_diff_eq!(smoothed_cross_entropy(row, 1, 0.0), -row[1], epsilon = 1e-12);
        assert!(smoothed_cross_entropy(row, 1, 0.1) > smoothed_cross_entropy(row, 1, 0.0));
    }

    #[test]
    fn test_log_add_exp() {
        assert_abs_diff_eq!(log_add_exp(0.0, 0.0), 2f64.ln(), epsilon = 1e-12);
        assert_eq!(log_add_exp(f64::NEG_INFINITY, 1.5), 1.5);
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(array![0.1, 0.7, 0.2].view()), (1, 0.7));
    }
}
