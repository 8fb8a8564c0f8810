//! One training step: batch, forward, loss, backward, update

use super::core::Trainer;
use crate::error::{Error, Result};
use crate::optim::StepOutcome;
use crate::train::loss::LossOutput;

/// What one call to [`Trainer::train_step`] did
#[derive(Debug, Clone)]
pub struct StepReport {
    /// Global step after this step
    pub step: u64,
    pub epoch: u64,
    /// Index of the batch within its epoch
    pub batch_index: usize,
    pub loss: LossOutput,
    pub outcome: StepOutcome,
}

impl Trainer {
    /// Run one step
    ///
    /// The ramp gates see the number of steps completed before this one.
    /// `Error::Exhausted` carries the global step of the last completed
    /// step; `Error::NonFiniteGradient` means the step was consumed but
    /// dropped.
    pub fn train_step(&mut self) -> Result<StepReport> {
        let step = self.step();
        let batch = match self.sampler.next_batch() {
            Ok(batch) => batch,
            Err(Error::Exhausted { .. }) => return Err(Error::Exhausted { last_step: step }),
            Err(e) => return Err(e),
        };

        let predictions = self.model.forward_batch(&batch)?;
        let loss = self.loss.compute_batch(&batch, &predictions, step)?;
        let grads = self.model.backward(&batch, &predictions, &loss)?;
        let outcome = self.controller.step(loss.total, self.model.params_mut(), grads)?;

        if let StepOutcome::ScaleOverflow { scale } = outcome {
            tracing::debug!(step = step + 1, scale, "step dropped on loss-scale overflow");
        }
        Ok(StepReport {
            step: self.step(),
            epoch: batch.epoch,
            batch_index: batch.index,
            loss,
            outcome,
        })
    }
}
