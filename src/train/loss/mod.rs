//! Composite semi-supervised alignment loss
//!
//! Seven terms, in fixed order (position `i` pairs with `weights[i]` and
//! `enable_RampUpScheduler[i]`):
//!
//! - [`LossTerm::FrameGhm`] - label-smoothed frame cross-entropy, GHM-weighted (full labels)
//! - [`LossTerm::EdgeGhm`] - boundary binary cross-entropy, GHM-weighted (full)
//! - [`LossTerm::EdgeEmd`] - earth mover's distance of cumulative boundaries (full)
//! - [`LossTerm::EdgeDiffGhm`] - squared error of boundary first differences, GHM-weighted (full)
//! - [`LossTerm::Ctc`] - CTC on the phoneme sequence (full and weak)
//! - [`LossTerm::Consistency`] - original vs augmented prediction divergence (any regime)
//! - [`LossTerm::PseudoLabel`] - cross-entropy on confident pseudo-labels (weak and none)
//!
//! The total is `Σ weights[i] * gate_i(step) * raw_i`.

mod ctc;
mod engine;
mod functional;
mod ghm;
mod terms;


pub use ctc::{ctc_nll, BLANK};
pub use engine::{CompositeLoss, LossState};
pub use ghm::{GhmHistogram, GhmState, GhmWeighter};

use crate::config::NUM_LOSS_TERMS;
use crate::data::LabelRegime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the seven loss terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossTerm {
    FrameGhm,
    EdgeGhm,
    EdgeEmd,
    EdgeDiffGhm,
    Ctc,
    Consistency,
    PseudoLabel,
}

impl LossTerm {
    pub const ALL: [LossTerm; NUM_LOSS_TERMS] = [
        LossTerm::FrameGhm,
        LossTerm::EdgeGhm,
        LossTerm::EdgeEmd,
        LossTerm::EdgeDiffGhm,
        LossTerm::Ctc,
        LossTerm::Consistency,
        LossTerm::PseudoLabel,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            LossTerm::FrameGhm => "frame_ghm",
            LossTerm::EdgeGhm => "edge_ghm",
            LossTerm::EdgeEmd => "edge_emd",
            LossTerm::EdgeDiffGhm => "edge_diff_ghm",
            LossTerm::Ctc => "ctc",
            LossTerm::Consistency => "consistency",
            LossTerm::PseudoLabel => "pseudo_label",
        }
    }

    /// Whether the term can apply to an example of this regime
    pub fn applies_to(self, regime: LabelRegime) -> bool {
        match self {
            LossTerm::FrameGhm | LossTerm::EdgeGhm | LossTerm::EdgeEmd | LossTerm::EdgeDiffGhm => {
                regime == LabelRegime::Full
            }
            LossTerm::Ctc => regime.has_phonemes(),
            LossTerm::Consistency => true,
            LossTerm::PseudoLabel => regime != LabelRegime::Full,
        }
    }

    /// Slot of the term's GHM density, for GHM-weighted terms
    pub(crate) fn ghm_slot(self) -> Option<usize> {
        match self {
            LossTerm::FrameGhm => Some(0),
            LossTerm::EdgeGhm => Some(1),
            LossTerm::EdgeDiffGhm => Some(2),
            _ => None,
        }
    }
}

impl fmt::Display for LossTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Contribution of one term to a loss evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermValue {
    pub term: LossTerm,
    /// Unweighted value, averaged over the examples it applied to
    pub raw: f64,
    pub weight: f32,
    pub gate: f32,
    /// `weight * gate * raw`, exactly zero when the coefficient is zero
    pub weighted: f64,
    /// Number of examples the term applied to
    pub examples: usize,
}

impl TermValue {
    /// Multiplier applied to the raw value
    pub fn coefficient(&self) -> f64 {
        f64::from(self.weight) * f64::from(self.gate)
    }
}

/// Result of a loss evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossOutput {
    pub total: f64,
    /// One entry per term, in [`LossTerm::ALL`] order
    pub breakdown: Vec<TermValue>,
}

impl LossOutput {
    pub fn term(&self, term: LossTerm) -> &TermValue {
        &self.breakdown[term.index()]
    }

    pub fn is_finite(&self) -> bool {
        self.total.is_finite()
    }
}
