use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::FieldErrors;

/// Respuesta a un envío de step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepResult {
    /// Validación fallida: mostrar el mismo step con errores. Nada avanzó.
    Redisplay { step_index: usize, errors: FieldErrors },
    /// Step commiteado; mostrar el siguiente.
    Advance { next_step_index: usize },
    /// Último step commiteado y completion ejecutada.
    Complete { result: CompletionResult },
}

impl StepResult {
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Redisplay { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    pub fn errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Redisplay { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResult {
    /// Valor devuelto por la acción del último step (o por la completion).
    pub outcome: Option<Value>,
    pub committed_steps: usize,
}
