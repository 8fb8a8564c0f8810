//! Cooperative cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag
///
/// The trainer checks it between steps: the in-flight step completes, a
/// checkpoint is persisted and the run ends in `DONE`.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request a stop on Ctrl-C
    pub fn install_ctrlc_handler(&self) -> crate::error::Result<()> {
        let signal = self.clone();
        ctrlc::set_handler(move || {
            tracing::warn!("interrupt received, stopping after the current step");
            signal.request();
        })
        .map_err(|e| crate::error::Error::Config(format!("failed to install Ctrl-C handler: {e}")))
    }
}
