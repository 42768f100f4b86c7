//! Estado de una ejecución de wizard en curso.
//!
//! `WizardSession` es un valor explícito que el llamador guarda entre
//! peticiones (store del servidor o payload oculto). Es serializable, y por
//! eso mismo no se confía en él: el motor re-verifica los tokens de todos los
//! steps commiteados antes de aceptar el siguiente.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::StepData;

/// Estados de la sesión. Transiciones válidas:
/// - `InProgress` -> `Completed`
/// - `InProgress` -> `Aborted`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    InProgress,
    Completed,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSession {
    session_id: Uuid,
    definition_hash: String,
    current_step: usize,
    status: SessionStatus,
    committed: BTreeMap<usize, StepData>,
    tokens: BTreeMap<usize, String>,
    created_at: DateTime<Utc>, // metadato (no entra en tokens)
}

impl WizardSession {
    pub(crate) fn new(definition_hash: &str) -> Self {
        Self { session_id: Uuid::new_v4(),
               definition_hash: definition_hash.to_string(),
               current_step: 0,
               status: SessionStatus::InProgress,
               committed: BTreeMap::new(),
               tokens: BTreeMap::new(),
               created_at: Utc::now() }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn definition_hash(&self) -> &str {
        &self.definition_hash
    }

    /// Próximo step esperado (== cantidad de steps commiteados).
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_closed(&self) -> bool {
        self.status != SessionStatus::InProgress
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn committed(&self) -> &BTreeMap<usize, StepData> {
        &self.committed
    }

    pub fn committed_data(&self, step_index: usize) -> Option<&StepData> {
        self.committed.get(&step_index)
    }

    pub fn token(&self, step_index: usize) -> Option<&str> {
        self.tokens.get(&step_index).map(String::as_str)
    }

    pub(crate) fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub(crate) fn commit(&mut self, step_index: usize, data: StepData, token: String) {
        debug_assert_eq!(step_index, self.current_step, "commits must be sequential");
        self.committed.insert(step_index, data);
        self.tokens.insert(step_index, token);
        self.current_step = step_index + 1;
    }

    pub(crate) fn abort(&mut self) {
        self.status = SessionStatus::Aborted;
    }

    pub(crate) fn complete(&mut self) {
        self.status = SessionStatus::Completed;
    }
}
