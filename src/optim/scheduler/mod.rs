//! Learning rate schedulers
//!
//! - `OneCycleLR` - cosine warmup to the peak lr, then cosine anneal
//! - `ConstantLR` - fixed learning rate

mod constant;
mod one_cycle;

#[cfg(test)]
mod tests;

pub use constant::ConstantLR;
pub use one_cycle::OneCycleLR;

use crate::config::LrSchedulerKind;

/// Learning rate scheduler trait
pub trait LRScheduler: Send {
    /// Get the current learning rate
    fn get_lr(&self) -> f32;

    /// Advance by one optimizer step
    fn step(&mut self);

    /// Jump to an absolute step (checkpoint resume)
    fn set_step(&mut self, step: u64);
}

/// Build the configured schedule for a group peaking at `lr`
pub fn build_scheduler(
    kind: LrSchedulerKind,
    lr: f32,
    total_steps: u64,
    pct_start: f32,
) -> Box<dyn LRScheduler> {
    match kind {
        LrSchedulerKind::OneCycle => Box::new(OneCycleLR::new(lr, total_steps, pct_start)),
        LrSchedulerKind::Constant => Box::new(ConstantLR::new(lr)),
    }
}
