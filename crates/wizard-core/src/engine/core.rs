//! Core WizardEngine implementation

use log::{debug, info, warn};
use serde_json::json;
use uuid::Uuid;

use crate::constants::STEP_MARKER_FIELD;
use crate::definition::WizardDefinition;
use crate::engine::completion::Completion;
use crate::errors::WizardError;
use crate::event::{EventStore, WizardEvent, WizardEventKind};
use crate::hashing::{hash_value, TokenInput, TokenSigner};
use crate::model::{FieldMap, FileMap, StepData, StepForm, WizardRequest, WizardSession};
use crate::step::{StepResult, ValidationContext};

/// Motor de secuenciado de steps.
///
/// Responsable de decidir qué step se envía, verificar los tokens de los
/// steps ya commiteados, delegar la validación al step y producir
/// "mostrar de nuevo", "avanzar" o "completar".
pub struct WizardEngine<E>
    where E: EventStore
{
    pub(crate) definition: WizardDefinition,
    pub(crate) signer: TokenSigner,
    pub(crate) completion: Box<dyn Completion>,
    pub(crate) event_store: E,
    pub(crate) prefix: String,
}

impl<E> WizardEngine<E> where E: EventStore
{
    pub fn definition(&self) -> &WizardDefinition {
        &self.definition
    }

    pub fn step_count(&self) -> usize {
        self.definition.len()
    }

    pub fn event_store(&self) -> &E {
        &self.event_store
    }

    pub fn events_for(&self, session_id: Uuid) -> Vec<WizardEvent> {
        self.event_store.list(session_id)
    }

    /// Crea una sesión nueva ligada a esta definición.
    pub fn start_session(&mut self) -> WizardSession {
        let definition_hash = self.definition.definition_hash().to_string();
        let session = WizardSession::new(&definition_hash);
        self.event_store.append_kind(session.session_id(),
                                     WizardEventKind::SessionStarted { definition_hash,
                                                                       step_count: self.definition.len() });
        debug!("wizard session {} started ({} steps)", session.session_id(), self.definition.len());
        session
    }

    /// Prefijo de los campos del step `step_index` (`{prefix}{step}`).
    pub fn prefix_for_step(&self, step_index: usize) -> String {
        format!("{}{}", self.prefix, step_index)
    }

    /// Nombres de plantilla candidatos para un renderer externo.
    pub fn template_names(&self, step_index: usize) -> Vec<String> {
        vec![format!("wizard_{}", step_index), "wizard".to_string()]
    }

    pub fn form_for(&self, step_index: usize) -> Result<StepForm, WizardError> {
        self.definition
            .step(step_index)
            .map(|s| s.form())
            .ok_or_else(|| WizardError::MalformedRequest(format!("step {} does not exist", step_index)))
    }

    /// Determina el step enviado a partir del marcador explícito.
    pub fn determine_current_step(&self, request: &WizardRequest) -> Result<usize, WizardError> {
        let raw = request.step_marker()
                         .ok_or_else(|| WizardError::MalformedRequest(format!("missing '{}' marker", STEP_MARKER_FIELD)))?;
        let step: usize = raw.trim()
                             .parse()
                             .map_err(|_| WizardError::MalformedRequest(format!("invalid step marker '{}'", raw)))?;
        if step >= self.definition.len() {
            return Err(WizardError::MalformedRequest(format!("step {} out of range [0, {})",
                                                             step,
                                                             self.definition.len())));
        }
        Ok(step)
    }

    /// Entrada completa de una petición: determina el step, quita el prefijo
    /// de sus campos/archivos y lo envía.
    pub fn handle(&mut self, session: &mut WizardSession, request: WizardRequest) -> Result<StepResult, WizardError> {
        let step_index = self.determine_current_step(&request)?;
        let field_prefix = format!("{}-", self.prefix_for_step(step_index));
        let fields: FieldMap = request.fields
                                      .iter()
                                      .filter_map(|(k, v)| k.strip_prefix(&field_prefix).map(|n| (n.to_string(), v.clone())))
                                      .collect();
        let mut files: FileMap = request.files
                                        .into_iter()
                                        .filter_map(|(k, v)| k.strip_prefix(&field_prefix).map(|n| (n.to_string(), v)))
                                        .collect();
        self.submit_step(session, step_index, &fields, &mut files)
    }

    /// Envía los datos (sin prefijo) del step `step_index`.
    pub fn submit_step(&mut self,
                       session: &mut WizardSession,
                       step_index: usize,
                       fields: &FieldMap,
                       files: &mut FileMap)
                       -> Result<StepResult, WizardError> {
        let session_id = session.session_id();
        if step_index >= self.definition.len() {
            return Err(WizardError::MalformedRequest(format!("step {} out of range [0, {})",
                                                             step_index,
                                                             self.definition.len())));
        }
        if step_index < session.current_step() {
            warn!("session {}: stale submission of step {} (current {})",
                  session_id,
                  step_index,
                  session.current_step());
            self.event_store.append_kind(session_id,
                                         WizardEventKind::StaleSubmission { step_index,
                                                                            current_step: session.current_step() });
            return Err(WizardError::StaleStep { step_index,
                                                current_step: session.current_step() });
        }
        // un step ya commiteado es "stale" también en una sesión cerrada
        if session.is_closed() {
            return Err(WizardError::SessionClosed);
        }

        if let Err(e) = self.verify_committed(session, step_index) {
            if let WizardError::IntegrityViolation { step_index, reason } = &e {
                warn!("session {} aborted: {}", session_id, reason);
                self.event_store.append_kind(session_id,
                                             WizardEventKind::IntegrityViolation { step_index: *step_index,
                                                                                   reason: reason.clone() });
            }
            session.abort();
            return Err(e);
        }

        let step = self.definition
                       .step(step_index)
                       .ok_or_else(|| WizardError::Internal(format!("missing step {}", step_index)))?;
        let ctx = ValidationContext::new(session_id, step_index, session.committed());
        let validation = step.validate(&ctx, fields, files)?;

        if !validation.is_valid() {
            debug!("session {}: step '{}' redisplayed with {} field error(s)",
                   session_id,
                   step.id(),
                   validation.errors.len());
            self.event_store.append_kind(session_id,
                                         WizardEventKind::StepRedisplayed { step_index,
                                                                            step_id: step.id().to_string(),
                                                                            errors: validation.errors.clone() });
            return Ok(StepResult::Redisplay { step_index,
                                              errors: validation.errors });
        }

        let cleaned = validation.cleaned;
        let token = self.sign_step(session, step_index, step.id(), &cleaned);
        session.commit(step_index, cleaned.clone(), token.clone());
        self.event_store.append_kind(session_id,
                                     WizardEventKind::StepCommitted { step_index,
                                                                      step_id: step.id().to_string(),
                                                                      token });
        info!("session {}: step '{}' committed", session_id, step.id());

        let mut outcome = None;
        if let Some(action) = step.after_commit() {
            match action.after_commit(&cleaned) {
                Ok(v) => outcome = v,
                Err(e) => {
                    warn!("session {}: after-commit of '{}' failed: {}", session_id, step.id(), e);
                    self.event_store.append_kind(session_id,
                                                 WizardEventKind::AfterCommitFailed { step_index,
                                                                                      step_id: step.id().to_string(),
                                                                                      error: e.clone() });
                    session.abort();
                    return Err(WizardError::Executor(e));
                }
            }
        }

        if step_index + 1 < self.definition.len() {
            return Ok(StepResult::Advance { next_step_index: step_index + 1 });
        }

        let result = match self.completion.complete(session.committed(), outcome) {
            Ok(r) => r,
            Err(e) => {
                warn!("session {}: completion failed: {}", session_id, e);
                session.abort();
                return Err(e);
            }
        };
        session.complete();
        let result_hash = hash_value(&json!({ "outcome": result.outcome, "committed_steps": result.committed_steps }));
        self.event_store.append_kind(session_id, WizardEventKind::SessionCompleted { result_hash });
        info!("session {} completed", session_id);
        Ok(StepResult::Complete { result })
    }

    /// Recalcula y compara el token de cada step commiteado `0..upto`. Toda
    /// discrepancia (dato alterado, token ausente, entradas sobrantes o una
    /// sesión de otra definición) es una violación de integridad.
    fn verify_committed(&self, session: &WizardSession, upto: usize) -> Result<(), WizardError> {
        if session.definition_hash() != self.definition.definition_hash() {
            return Err(WizardError::violation(None, "session belongs to a different wizard definition"));
        }
        let current = session.current_step();
        if session.committed().len() != current || session.token_count() != current {
            return Err(WizardError::violation(None, "committed step data does not match session cursor"));
        }
        for i in 0..upto {
            let step = self.definition
                           .step(i)
                           .ok_or_else(|| WizardError::violation(Some(i), format!("step {} does not exist", i)))?;
            let (data, token) = match (session.committed_data(i), session.token(i)) {
                (Some(d), Some(t)) => (d, t),
                _ => return Err(WizardError::violation(Some(i), format!("step {} has not been committed", i))),
            };
            let previous = if i == 0 { "" } else { session.token(i - 1).unwrap_or("") };
            let input = TokenInput { session_id: session.session_id(),
                                     definition_hash: self.definition.definition_hash(),
                                     step_index: i,
                                     step_id: step.id(),
                                     data,
                                     previous };
            if !self.signer.verify(&input, token) {
                return Err(WizardError::violation(Some(i), format!("integrity token mismatch for step {}", i)));
            }
        }
        Ok(())
    }

    fn sign_step(&self, session: &WizardSession, step_index: usize, step_id: &str, data: &StepData) -> String {
        let previous = if step_index == 0 { "" } else { session.token(step_index - 1).unwrap_or("") };
        let input = TokenInput { session_id: session.session_id(),
                                 definition_hash: self.definition.definition_hash(),
                                 step_index,
                                 step_id,
                                 data,
                                 previous };
        self.signer.sign(&input)
    }
}
