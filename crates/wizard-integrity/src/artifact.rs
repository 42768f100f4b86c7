//! Artifact en evaluación de integridad.
//!
//! Invariante: `verdict == Verified` sii el digest calculado coincide con el
//! declarado y el formato es válido. Sólo el pipeline construye y muta un
//! `StagedArtifact`, de modo que el invariante no puede romperse desde fuera.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::IntegrityError;
use crate::kind::ArtifactKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    ChecksumMismatch,
    InvalidFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedArtifact {
    kind: ArtifactKind,
    declared_digest: String,
    computed_digest: Option<String>, // sólo tras consumir el stream completo
    staging_path: PathBuf,
    format_valid: bool,
    verdict: Verdict,
    rejection: Option<RejectReason>,
    bytes_written: u64,
}

impl StagedArtifact {
    pub(crate) fn pending(kind: ArtifactKind, declared_digest: &str, staging_path: PathBuf) -> Self {
        Self { kind,
               declared_digest: declared_digest.trim().to_string(),
               computed_digest: None,
               staging_path,
               format_valid: false,
               verdict: Verdict::Pending,
               rejection: None,
               bytes_written: 0 }
    }

    pub(crate) fn streamed(&mut self, computed_digest: String, bytes_written: u64) {
        self.computed_digest = Some(computed_digest);
        self.bytes_written = bytes_written;
    }

    pub(crate) fn reject(&mut self, reason: RejectReason) {
        self.verdict = Verdict::Rejected;
        self.rejection = Some(reason);
    }

    pub(crate) fn verify(&mut self) {
        self.format_valid = true;
        self.verdict = Verdict::Verified;
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn declared_digest(&self) -> &str {
        &self.declared_digest
    }

    pub fn computed_digest(&self) -> Option<&str> {
        self.computed_digest.as_deref()
    }

    /// Ruta del archivo de staging. En un artifact rechazado el archivo ya no
    /// existe.
    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    pub fn format_valid(&self) -> bool {
        self.format_valid
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn rejection(&self) -> Option<RejectReason> {
        self.rejection
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn is_verified(&self) -> bool {
        self.verdict == Verdict::Verified
    }

    /// Convierte un rechazo en el error de campo correspondiente.
    pub fn into_verified(self) -> Result<Self, IntegrityError> {
        match (self.verdict, self.rejection) {
            (Verdict::Verified, _) => Ok(self),
            (_, Some(RejectReason::InvalidFormat)) => Err(IntegrityError::FormatValidation(self.kind)),
            _ => Err(IntegrityError::ChecksumMismatch(self.kind)),
        }
    }
}
