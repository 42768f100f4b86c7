//! Errores del pipeline de integridad.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use wizard_core::{ExecutorError, WizardError};

use crate::kind::ArtifactKind;

#[derive(Debug, Error)]
pub enum IntegrityError {
    /// El digest calculado no coincide con el declarado.
    #[error("{}", .0.rejection_message())]
    ChecksumMismatch(ArtifactKind),
    /// El digest coincide pero el contenedor no es válido.
    #[error("{}", .0.rejection_message())]
    FormatValidation(ArtifactKind),
    #[error("staging I/O failure on {path:?}: {source}")]
    StagingIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("a {0} staging operation is already in progress")]
    Conflict(ArtifactKind),
    /// El ejecutor no pudo inspeccionar el artifact.
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

impl IntegrityError {
    /// Rechazos del artifact (errores de campo para el usuario), frente a
    /// fallos de infraestructura.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::ChecksumMismatch(_) | Self::FormatValidation(_))
    }
}

impl From<IntegrityError> for WizardError {
    fn from(err: IntegrityError) -> Self {
        match err {
            IntegrityError::StagingIo { .. } => WizardError::StagingIo(err.to_string()),
            IntegrityError::Conflict(_) => WizardError::Conflict(err.to_string()),
            IntegrityError::Executor(e) => WizardError::Executor(e),
            IntegrityError::ChecksumMismatch(_) | IntegrityError::FormatValidation(_) => {
                WizardError::Internal(format!("unhandled artifact rejection: {err}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executor_failures_keep_their_type() {
        let err: IntegrityError = ExecutorError::new("validate_container_format", "xz not installed").into();
        assert!(!err.is_rejection());
        assert_eq!(WizardError::from(err),
                   WizardError::Executor(ExecutorError::new("validate_container_format", "xz not installed")));
    }

    #[test]
    fn rejections_use_the_user_message() {
        let err = IntegrityError::FormatValidation(ArtifactKind::ServicePack);
        assert!(err.is_rejection());
        assert_eq!(err.to_string(), "Invalid service pack or checksum");
    }
}
