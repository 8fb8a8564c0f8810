//! The RUNNING loop with validation and checkpoint boundaries

use super::core::Trainer;
use super::phase::Phase;
use super::result::TrainResult;
use super::step::StepReport;
use crate::error::{Error, Result};
use crate::optim::StepOutcome;
use crate::train::callback::CallbackAction;
use std::time::Instant;

impl Trainer {
    /// Train until the step budget is used up or a stop is requested
    ///
    /// Validation runs every `val_check_interval` steps and checkpoints are
    /// written every checkpoint interval, dropped steps included. A stop
    /// request finishes the in-flight step and persists a checkpoint before
    /// returning.
    pub fn train(&mut self) -> Result<TrainResult> {
        if self.phase == Phase::Done {
            return Err(Error::Config("trainer already finished; build a new one to train again".into()));
        }
        self.start_time = Some(Instant::now());
        let mut result = TrainResult { resumed_from: self.resumed_from, ..Default::default() };
        let total_steps = self.spec.optimizer_config.total_steps;
        let val_every = self.spec.val_check_interval;
        let ckpt_every = self.spec.checkpoint_interval().max(1);

        self.transition(Phase::Running);
        let ctx = self.build_context();
        let mut stop_requested = self.callbacks.on_train_begin(&ctx) == CallbackAction::Stop;

        while !stop_requested && !self.controller.is_exhausted() {
            if self.stop.is_requested() {
                break;
            }

            let mut ctx = self.build_context();
            match self.train_step() {
                Ok(report) => {
                    self.record(&report, &mut result);
                    ctx = self.build_context();
                    ctx.loss = Some(report.loss.total);
                    ctx.terms = report.loss.breakdown.iter().map(|t| (t.term.name(), t.weighted)).collect();
                    if let StepOutcome::Applied { grad_norm, .. } = report.outcome {
                        ctx.grad_norm = Some(grad_norm);
                    } else {
                        ctx.dropped = true;
                    }
                }
                Err(e @ Error::NonFiniteGradient { .. }) => {
                    result.dropped_steps += 1;
                    tracing::warn!(
                        step = self.step(),
                        consecutive = self.controller.consecutive_nonfinite(),
                        tolerance = self.spec.max_consecutive_nonfinite,
                        error = %e,
                        "dropped step"
                    );
                    ctx.step = self.step();
                    ctx.dropped = true;
                }
                Err(e) => {
                    tracing::error!(step = self.step(), error = %e, "training failed");
                    return Err(e);
                }
            }

            if self.callbacks.on_step_end(&ctx) == CallbackAction::Stop {
                stop_requested = true;
            }

            let step = self.step();
            if step.is_multiple_of(val_every) && self.validate(&mut result)? == CallbackAction::Stop {
                stop_requested = true;
            }
            if self.options.periodic_checkpoints && step.is_multiple_of(ckpt_every) {
                self.checkpoint(&mut result);
            }
            self.transition(Phase::Running);
        }

        if !self.controller.is_exhausted() {
            result.stopped_early = true;
            let step = self.step();
            if self.options.periodic_checkpoints && self.ring.latest() != Some(step) && step > 0 {
                self.checkpoint(&mut result);
            }
            tracing::info!(step, total_steps, "stop requested, training halted");
        }

        if let Some(path) = self.options.final_weights.clone() {
            self.save_final_weights(&path, &mut result);
        }

        self.transition(Phase::Done);
        result.final_step = self.step();
        result.final_epoch = self.sampler.position().epoch;
        result.checkpoints = self.ring.steps();
        result.elapsed_secs = self.elapsed_secs();
        let ctx = self.build_context();
        self.callbacks.on_train_end(&ctx);
        Ok(result)
    }

    fn record(&mut self, report: &StepReport, result: &mut TrainResult) {
        match report.outcome {
            StepOutcome::Applied { .. } => result.final_loss = Some(report.loss.total),
            StepOutcome::ScaleOverflow { .. } => result.overflow_steps += 1,
            StepOutcome::BudgetExhausted => {}
        }
        result.final_epoch = report.epoch;
    }

    /// VALIDATING: run the evaluator if one is attached
    fn validate(&mut self, result: &mut TrainResult) -> Result<CallbackAction> {
        if self.evaluator.is_none() {
            return Ok(CallbackAction::Continue);
        }
        self.transition(Phase::Validating);
        let step = self.controller.steps_taken();
        let Some(evaluator) = self.evaluator.as_mut() else {
            return Ok(CallbackAction::Continue);
        };
        let metrics = evaluator.evaluate(self.model.as_ref(), &self.loss, step)?;
        result.validation_steps.push(step);

        let mut ctx = self.build_context();
        ctx.metrics = Some(metrics.clone());
        result.last_metrics = Some(metrics);
        Ok(self.callbacks.on_validation(&ctx))
    }
}
