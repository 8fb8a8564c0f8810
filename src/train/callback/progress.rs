//! Progress callback emitting structured log events

use super::traits::{CallbackAction, CallbackContext, TrainerCallback};

/// Logs the global step, loss and learning rates every `log_interval` steps
#[derive(Clone, Debug)]
pub struct ProgressCallback {
    log_interval: u64,
}

impl ProgressCallback {
    pub fn new(log_interval: u64) -> Self {
        Self { log_interval: log_interval.max(1) }
    }

    pub fn should_log(&self, step: u64) -> bool {
        step > 0 && step.is_multiple_of(self.log_interval)
    }
}

impl Default for ProgressCallback {
    fn default() -> Self {
        Self::new(50)
    }
}

impl TrainerCallback for ProgressCallback {
    fn on_train_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        tracing::info!(step = ctx.step, total_steps = ctx.total_steps, epoch = ctx.position.epoch, "training started");
        CallbackAction::Continue
    }

    fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        if self.should_log(ctx.step) {
            let terms = ctx
                .terms
                .iter()
                .map(|(name, v)| format!("{name}={v:.4}"))
                .collect::<Vec<_>>()
                .join(" ");
            tracing::info!(
                step = ctx.step,
                total_steps = ctx.total_steps,
                epoch = ctx.position.epoch,
                loss = ctx.loss.unwrap_or(f64::NAN),
                lr_backbone = ctx.lr[0],
                lr_head = ctx.lr[1],
                grad_norm = ctx.grad_norm.unwrap_or(f32::NAN),
                terms = %terms,
                "train step"
            );
        }
        CallbackAction::Continue
    }

    fn on_validation(&mut self, ctx: &CallbackContext) -> CallbackAction {
        if let Some(metrics) = &ctx.metrics {
            for (name, value) in metrics {
                tracing::info!(step = ctx.step, metric = %name, value, "validation");
            }
        }
        CallbackAction::Continue
    }

    fn on_train_end(&mut self, ctx: &CallbackContext) {
        tracing::info!(step = ctx.step, elapsed_secs = ctx.elapsed_secs, "training finished");
    }

    fn name(&self) -> &'static str {
        "ProgressCallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_interval() {
        let progress = ProgressCallback::new(5);
        assert!(!progress.should_log(0));
        assert!(!progress.should_log(4));
        assert!(progress.should_log(5));
        assert!(progress.should_log(10));
        assert!(ProgressCallback::new(0).should_log(1));
    }

    #[test]
    fn test_progress_callback_never_stops() {
        let mut progress = ProgressCallback::default();
        let ctx = CallbackContext { step: 50, loss: Some(0.5), ..Default::default() };
        assert_eq!(progress.on_train_begin(&ctx), CallbackAction::Continue);
        assert_eq!(progress.on_step_end(&ctx), CallbackAction::Continue);
        assert_eq!(progress.on_validation(&ctx), CallbackAction::Continue);
        progress.on_train_end(&ctx);
    }
}
