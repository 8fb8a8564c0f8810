//! One-cycle learning rate scheduler

use super::LRScheduler;
use std::f32::consts::PI;

/// One-cycle schedule over a fixed step budget
///
/// - Phase 1 (`pct_start * total_steps`): cosine ramp from
///   `max_lr / div_factor` up to `max_lr`
/// - Phase 2: cosine anneal from `max_lr` down to
///   `max_lr / (div_factor * final_div_factor)`
#[derive(Debug, Clone)]
pub struct OneCycleLR {
    max_lr: f32,
    initial_lr: f32,
    min_lr: f32,
    warmup_steps: u64,
    total_steps: u64,
    current_step: u64,
}

fn cosine_interp(start: f32, end: f32, progress: f32) -> f32 {
    end + (start - end) * 0.5 * (1.0 + (PI * progress.clamp(0.0, 1.0)).cos())
}

impl OneCycleLR {
    pub const DIV_FACTOR: f32 = 25.0;
    pub const FINAL_DIV_FACTOR: f32 = 1e4;

    pub fn new(max_lr: f32, total_steps: u64, pct_start: f32) -> Self {
        let warmup_steps = ((total_steps as f64) * f64::from(pct_start)).round() as u64;
        let initial_lr = max_lr / Self::DIV_FACTOR;
        Self {
            max_lr,
            initial_lr,
            min_lr: initial_lr / Self::FINAL_DIV_FACTOR,
            warmup_steps: warmup_steps.min(total_steps),
            total_steps,
            current_step: 0,
        }
    }

    pub fn warmup_steps(&self) -> u64 {
        self.warmup_steps
    }
}

impl LRScheduler for OneCycleLR {
    fn get_lr(&self) -> f32 {
        let step = self.current_step.min(self.total_steps);
        if step < self.warmup_steps {
            let progress = step as f32 / self.warmup_steps as f32;
            return cosine_interp(self.initial_lr, self.max_lr, progress);
        }
        let decay_steps = self.total_steps - self.warmup_steps;
        if decay_steps == 0 {
            return self.min_lr;
        }
        let progress = (step - self.warmup_steps) as f32 / decay_steps as f32;
        cosine_interp(self.max_lr, self.min_lr, progress)
    }

    fn step(&mut self) {
        self.current_step += 1;
    }

    fn set_step(&mut self, step: u64) {
        self.current_step = step;
    }
}
