//! Error types for alinear
//!
//! Every fatal condition of a training run maps to one variant. Recoverable
//! conditions (a dropped non-finite step, a failed checkpoint save) are also
//! represented here so callers can log and count them uniformly.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for alinear operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or running a training job
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed, missing or inconsistent configuration. Raised before any
    /// training step runs.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The example streams ran dry and epoch restart is disabled.
    #[error("Data exhausted after step {last_step}: no examples remain and epoch restart is disabled")]
    Exhausted { last_step: u64 },

    /// Gradients (or the loss) were NaN/Inf at the given step.
    #[error("Non-finite gradient at step {step}")]
    NonFiniteGradient { step: u64 },

    /// Too many consecutive steps were dropped for non-finite gradients.
    #[error("Non-finite gradients on {count} consecutive steps (tolerance {tolerance}), last at step {step}")]
    NonFiniteTolerance { step: u64, count: usize, tolerance: usize },

    /// Persisting or restoring training state failed.
    #[error("Checkpoint I/O error on {path}: {message}")]
    CheckpointIo { path: PathBuf, message: String },

    /// Example source failure (missing manifest entry, malformed payload).
    #[error("Data error: {0}")]
    Data(String),

    /// Model execution collaborator failure.
    #[error("Model error: {0}")]
    Model(String),

    /// Serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Underlying I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a checkpoint I/O error for a path
    pub fn checkpoint_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CheckpointIo { path: path.into(), message: message.into() }
    }

    /// Whether the trainer may continue after this error
    ///
    /// A dropped non-finite step and a failed checkpoint save are both
    /// recoverable; everything else ends the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonFiniteGradient { .. } | Self::CheckpointIo { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<crate::config::ValidationError> for Error {
    fn from(e: crate::config::ValidationError) -> Self {
        Self::Config(format!("Invalid config: {e}"))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Config(format!("Failed to parse YAML config: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_variants() {
        assert!(Error::NonFiniteGradient { step: 3 }.is_recoverable());
        assert!(Error::checkpoint_io("/tmp/x", "disk full").is_recoverable());
        assert!(!Error::Exhausted { last_step: 7 }.is_recoverable());
        assert!(!Error::Config("bad".into()).is_recoverable());
    }

    #[test]
    fn test_exhausted_message_carries_step() {
        let msg = Error::Exhausted { last_step: 42 }.to_string();
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
