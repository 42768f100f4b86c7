//! Tipos de evento de sesión y estructura `WizardEvent`.
//!
//! Rol:
//! - Cada transición del `WizardEngine` emite un evento a un `EventStore`
//!   append-only (auditoría de quién intentó qué).
//! - Los eventos son observacionales: los tokens de integridad se calculan
//!   sólo a partir de los datos commiteados, nunca de eventos.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ExecutorError;
use crate::model::FieldErrors;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WizardEventKind {
    /// Primer evento de una sesión: fija la definición y cantidad de steps.
    SessionStarted { definition_hash: String, step_count: usize },
    StepCommitted { step_index: usize, step_id: String, token: String },
    /// Validación fallida; el step se vuelve a mostrar.
    StepRedisplayed { step_index: usize, step_id: String, errors: FieldErrors },
    /// Reenvío de un step ya commiteado (rechazado sin cambios).
    StaleSubmission { step_index: usize, current_step: usize },
    /// Token inválido o sesión ajena a la definición. La sesión se aborta.
    IntegrityViolation { step_index: Option<usize>, reason: String },
    AfterCommitFailed { step_index: usize, step_id: String, error: ExecutorError },
    /// Cierre con hash del resultado de la completion.
    SessionCompleted { result_hash: String },
}

impl WizardEventKind {
    /// Forma compacta, útil en logs y asserts.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "I",
            Self::StepCommitted { .. } => "C",
            Self::StepRedisplayed { .. } => "R",
            Self::StaleSubmission { .. } => "S",
            Self::IntegrityViolation { .. } => "X",
            Self::AfterCommitFailed { .. } => "E",
            Self::SessionCompleted { .. } => "D",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardEvent {
    pub seq: u64, // asignado por el store (orden append)
    pub session_id: Uuid,
    pub kind: WizardEventKind,
    pub ts: DateTime<Utc>,
}
