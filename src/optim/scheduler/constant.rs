//! Constant learning rate

use super::LRScheduler;

/// Keeps the configured learning rate for the whole run
#[derive(Debug, Clone)]
pub struct ConstantLR {
    lr: f32,
}

impl ConstantLR {
    pub fn new(lr: f32) -> Self {
        Self { lr }
    }
}

impl LRScheduler for ConstantLR {
    fn get_lr(&self) -> f32 {
        self.lr
    }

    fn step(&mut self) {}

    fn set_step(&mut self, _step: u64) {}
}
