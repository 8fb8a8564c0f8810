//! Callback manager for dispatching events to multiple callbacks

use super::traits::{CallbackAction, CallbackContext, TrainerCallback};

/// Manages multiple callbacks and dispatches events
#[derive(Default)]
pub struct CallbackManager {
    callbacks: Vec<Box<dyn TrainerCallback>>,
}

impl CallbackManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<C: TrainerCallback + 'static>(&mut self, callback: C) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn add_boxed(&mut self, callback: Box<dyn TrainerCallback>) {
        self.callbacks.push(callback);
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Every callback sees the event; `Stop` wins if any asks for it
    fn dispatch(&mut self, mut f: impl FnMut(&mut dyn TrainerCallback) -> CallbackAction) -> CallbackAction {
        let mut action = CallbackAction::Continue;
        for cb in &mut self.callbacks {
            if f(cb.as_mut()) == CallbackAction::Stop {
                tracing::info!(callback = cb.name(), "callback requested stop");
                action = CallbackAction::Stop;
            }
        }
        action
    }

    pub fn on_train_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.dispatch(|cb| cb.on_train_begin(ctx))
    }

    pub fn on_train_end(&mut self, ctx: &CallbackContext) {
        for cb in &mut self.callbacks {
            cb.on_train_end(ctx);
        }
    }

    pub fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.dispatch(|cb| cb.on_step_end(ctx))
    }

    pub fn on_validation(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.dispatch(|cb| cb.on_validation(ctx))
    }

    pub fn on_checkpoint(&mut self, ctx: &CallbackContext) {
        for cb in &mut self.callbacks {
            cb.on_checkpoint(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        seen: Arc<Mutex<Vec<u64>>>,
        stop_at: Option<u64>,
    }

    impl TrainerCallback for Recorder {
        fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(ctx.step);
            }
            if self.stop_at == Some(ctx.step) {
                CallbackAction::Stop
            } else {
                CallbackAction::Continue
            }
        }
    }

    #[test]
    fn test_callback_manager_dispatch() {
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));
        let mut manager = CallbackManager::new();
        manager.add(Recorder { seen: Arc::clone(&first), stop_at: Some(2) });
        manager.add(Recorder { seen: Arc::clone(&second), stop_at: None });
        assert_eq!(manager.len(), 2);

        let mut ctx = CallbackContext { step: 1, ..Default::default() };
        assert_eq!(manager.on_step_end(&ctx), CallbackAction::Continue);
        ctx.step = 2;
        assert_eq!(manager.on_step_end(&ctx), CallbackAction::Stop);

        // The callback after the stopping one still saw the event
        assert_eq!(*second.lock().unwrap(), vec![1, 2]);
        assert_eq!(*first.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_empty_manager_continues() {
        let mut manager = CallbackManager::default();
        assert!(manager.is_empty());
        assert_eq!(manager.on_validation(&CallbackContext::default()), CallbackAction::Continue);
    }
}
