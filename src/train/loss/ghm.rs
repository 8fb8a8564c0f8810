//! Gradient-harmonized weighting
//!
//! Each element's gradient magnitude `g = |p - t|` (scaled into `[0, 1]`)
//! falls into one of `num_bins` equal-width bins. Elements in densely
//! populated bins are down-weighted:
//!
//! ```text
//! w(g) = 1 / (num_bins * density[bin(g)])
//! ```
//!
//! renormalised so the mean weight over the elements of one call is 1.
//! The density is an exponential moving average of the observed bin
//! fractions, starting uniform:
//!
//! ```text
//! density = alpha * density + (1 - alpha) * fraction
//! ```

use serde::{Deserialize, Serialize};

/// Persistent EMA density for one GHM-weighted term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GhmState {
    pub density: Vec<f64>,
}

/// Bin counts gathered before the density is updated
#[derive(Debug, Clone, PartialEq)]
pub struct GhmHistogram {
    counts: Vec<u64>,
}

impl GhmHistogram {
    pub fn new(num_bins: usize) -> Self {
        Self { counts: vec![0; num_bins] }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }
}

/// EMA-density weighting for one term
#[derive(Debug, Clone, PartialEq)]
pub struct GhmWeighter {
    alpha: f64,
    density: Vec<f64>,
}

impl GhmWeighter {
    pub fn new(num_bins: usize, alpha: f32) -> Self {
        let num_bins = num_bins.max(1);
        Self {
            alpha: f64::from(alpha),
            density: vec![1.0 / num_bins as f64; num_bins],
        }
    }

    pub fn num_bins(&self) -> usize {
        self.density.len()
    }

    pub fn density(&self) -> &[f64] {
        &self.density
    }

    /// Bin of a gradient magnitude; values outside `[0, 1]` are clamped
    pub fn bin_of(&self, g: f64) -> usize {
        let n = self.num_bins();
        let g = if g.is_finite() { g.clamp(0.0, 1.0) } else { 1.0 };
        ((g * n as f64) as usize).min(n - 1)
    }

    /// Per-element weights for the given gradient magnitudes
    ///
    /// Bin counts are added to `histogram`; the density itself is left
    /// untouched until [`GhmWeighter::update`].
    pub fn weights(&self, magnitudes: &[f64], histogram: &mut GhmHistogram) -> Vec<f64> {
        if magnitudes.is_empty() {
            return Vec::new();
        }
        let n = self.num_bins() as f64;
        let bins: Vec<usize> = magnitudes.iter().map(|&g| self.bin_of(g)).collect();
        let raw: Vec<f64> = bins
            .iter()
            .map(|&b| {
                histogram.counts[b] += 1;
                let d = self.density[b];
                if d > 0.0 {
                    1.0 / (n * d)
                } else {
                    1.0
                }
            })
            .collect();
        let mean = raw.iter().sum::<f64>() / raw.len() as f64;
        raw.into_iter().map(|w| w / mean).collect()
    }

    /// Fold observed bin fractions into the EMA density
    pub fn update(&mut self, histogram: &GhmHistogram) {
        let total = histogram.total();
        if total == 0 {
            return;
        }
        for (d, &c) in self.density.iter_mut().zip(&histogram.counts) {
            let fraction = c as f64 / total as f64;
            *d = self.alpha * *d + (1.0 - self.alpha) * fraction;
        }
    }

    pub fn state(&self) -> GhmState {
        GhmState { density: self.density.clone() }
    }

    /// Restore a saved density; a bin-count mismatch is ignored and the
    /// current density kept
    pub fn load(&mut self, state: &GhmState) -> bool {
        if state.density.len() != self.density.len() {
            return false;
        }
        self.density.clone_from(&state.density);
        true
    }
}

/// Weighted mean of per-element losses
pub(crate) fn weighted_mean(losses: &[f64], weights: &[f64]) -> f64 {
    if losses.is_empty() {
        return 0.0;
    }
    losses.iter().zip(weights).map(|(l, w)| l * w).sum::<f64>() / losses.len() as f64
}
