//! Ramp-up gating of loss terms
//!
//! Terms whose `enable_RampUpScheduler` flag is off are active from step 0
//! with gate 1. Flagged terms are inactive (gate 0) before the ramp start
//! step and active from it onward. The step policy jumps straight to 1; the
//! Gaussian policy follows `exp(-5 (1 - p)^2)` for progress `p` between the
//! start and end steps, then stays at 1.
//!
//! The gate is a pure function of term, step and configuration, so a
//! resumed run reproduces it without any saved cursor.

use crate::config::{RampPolicyKind, TrainSpec};

#[derive(Debug, Clone, PartialEq)]
pub struct RampScheduler {
    enabled: Vec<bool>,
    policy: RampPolicyKind,
    start: u64,
    end: u64,
}

impl RampScheduler {
    pub fn new(enabled: Vec<bool>, policy: RampPolicyKind, start: u64, end: u64) -> Self {
        Self { enabled, policy, start, end: end.max(start.saturating_add(1)) }
    }

    pub fn from_spec(spec: &TrainSpec) -> Self {
        Self::new(
            spec.loss_config.losses.enable_ramp_up.clone(),
            spec.loss_config.ramp_up.policy,
            spec.ramp_start_step(),
            spec.ramp_end_step(),
        )
    }

    /// No term is ramped
    pub fn always_on(num_terms: usize) -> Self {
        Self::new(vec![false; num_terms], RampPolicyKind::Step, 0, 1)
    }

    pub fn start_step(&self) -> u64 {
        self.start
    }

    pub fn num_terms(&self) -> usize {
        self.enabled.len()
    }

    pub fn is_active(&self, term: usize, step: u64) -> bool {
        self.gate(term, step) > 0.0
    }

    /// Multiplier in `[0, 1]`; unknown term indices are inactive
    pub fn gate(&self, term: usize, step: u64) -> f32 {
        match self.enabled.get(term) {
            None => 0.0,
            Some(false) => 1.0,
            Some(true) if step < self.start => 0.0,
            Some(true) => match self.policy {
                RampPolicyKind::Step => 1.0,
                RampPolicyKind::Gaussian if step >= self.end => 1.0,
                RampPolicyKind::Gaussian => {
                    let progress = (step - self.start) as f32 / (self.end - self.start) as f32;
                    (-5.0 * (1.0 - progress).powi(2)).exp()
                }
            },
        }
    }
}
