//! Connectionist temporal classification
//!
//! Forward (alpha) recursion in log space over the blank-extended label
//! sequence `[b, l1, b, l2, ..., b]`. Class 0 is the blank.

use super::functional::log_add_exp;
use ndarray::Array2;

pub const BLANK: usize = 0;

/// Negative log-likelihood of `target` under per-frame log-probabilities
///
/// Returns `None` when no alignment exists (too few frames for the target,
/// or a label outside the vocabulary).
pub fn ctc_nll(log_probs: &Array2<f64>, target: &[usize]) -> Option<f64> {
    let frames = log_probs.nrows();
    let vocab = log_probs.ncols();
    if frames == 0 || target.iter().any(|&l| l >= vocab || l == BLANK) {
        return None;
    }

    let mut extended = Vec::with_capacity(2 * target.len() + 1);
    extended.push(BLANK);
    for &label in target {
        extended.push(label);
        extended.push(BLANK);
    }
    let s = extended.len();

    let mut alpha = vec![f64::NEG_INFINITY; s];
    alpha[0] = log_probs[[0, extended[0]]];
    if s > 1 {
        alpha[1] = log_probs[[0, extended[1]]];
    }

    let mut next = vec![f64::NEG_INFINITY; s];
    for t in 1..frames {
        for i in 0..s {
            let mut acc = alpha[i];
            if i >= 1 {
                acc = log_add_exp(acc, alpha[i - 1]);
            }
            if i >= 2 && extended[i] != BLANK && extended[i] != extended[i - 2] {
                acc = log_add_exp(acc, alpha[i - 2]);
            }
            next[i] = if acc == f64::NEG_INFINITY {
                acc
            } else {
                acc + log_probs[[t, extended[i]]]
            };
        }
        std::mem::swap(&mut alpha, &mut next);
    }

    let tail = if s > 1 {
        log_add_exp(alpha[s - 1], alpha[s - 2])
    } else {
        alpha[s - 1]
    };
    if tail.is_finite() {
        Some(-tail)
    } else {
        None
    }
}
