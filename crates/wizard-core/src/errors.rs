//! Errores del core del wizard.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error devuelto por el ejecutor privilegiado (colaborador externo).
#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[error("executor action '{action}' failed: {message}")]
pub struct ExecutorError {
    pub action: String,
    pub message: String,
}

impl ExecutorError {
    pub fn new(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self { action: action.into(),
               message: message.into() }
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum WizardError {
    #[error("malformed request: {0}")] MalformedRequest(String),
    #[error("integrity violation: {reason}")] IntegrityViolation { step_index: Option<usize>, reason: String },
    #[error("step {step_index} already committed (current step is {current_step})")] StaleStep { step_index: usize, current_step: usize },
    #[error("wizard session is closed")] SessionClosed,
    #[error("staging I/O failure: {0}")] StagingIo(String),
    #[error("staging conflict: {0}")] Conflict(String),
    #[error(transparent)] Executor(#[from] ExecutorError),
    #[error("configuration error: {0}")] Configuration(String),
    #[error("internal: {0}")] Internal(String),
}

impl WizardError {
    /// Errores tras los cuales la sesión queda abortada y el usuario debe
    /// reiniciar el wizard.
    pub fn aborts_session(&self) -> bool {
        matches!(self, Self::IntegrityViolation { .. } | Self::Executor(_))
    }

    pub(crate) fn violation(step_index: Option<usize>, reason: impl Into<String>) -> Self {
        Self::IntegrityViolation { step_index,
                                   reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executor_error_is_transparent() {
        let err: WizardError = ExecutorError::new("apply_firmware", "flash failed").into();
        assert_eq!(err.to_string(), "executor action 'apply_firmware' failed: flash failed");
        assert!(err.aborts_session());
    }

    #[test]
    fn stale_step_does_not_abort() {
        let err = WizardError::StaleStep { step_index: 0,
                                           current_step: 1 };
        assert!(!err.aborts_session());
        assert_eq!(err.to_string(), "step 0 already committed (current step is 1)");
    }
}
