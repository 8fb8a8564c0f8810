//! Training result types

use crate::train::model::Metrics;

/// Summary of a finished run
#[derive(Debug, Clone, Default)]
pub struct TrainResult {
    /// Global step when the run ended
    pub final_step: u64,
    /// Epoch of the last batch
    pub final_epoch: u64,
    /// Total loss of the last applied step
    pub final_loss: Option<f64>,
    /// Steps dropped for non-finite gradients
    pub dropped_steps: u64,
    /// Steps dropped for fp16 loss-scale overflow
    pub overflow_steps: u64,
    /// Steps at which validation ran
    pub validation_steps: Vec<u64>,
    /// Metrics of the last validation
    pub last_metrics: Option<Metrics>,
    /// Checkpoints retained at the end, oldest first
    pub checkpoints: Vec<u64>,
    /// Checkpoint saves that failed after all retries
    pub failed_saves: usize,
    /// The run ended on a stop request rather than the step budget
    pub stopped_early: bool,
    /// Step the run resumed from, if it did
    pub resumed_from: Option<u64>,
    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_result_default() {
        let result = TrainResult::default();
        assert_eq!(result.final_step, 0);
        assert!(!result.stopped_early);
        assert!(result.checkpoints.is_empty());
    }
}
