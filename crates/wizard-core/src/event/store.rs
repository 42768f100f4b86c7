use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

use super::{WizardEvent, WizardEventKind};

/// Almacenamiento de eventos append-only.
pub trait EventStore {
    /// Agrega un evento a partir de su kind y devuelve el evento completo (con seq y ts).
    fn append_kind(&mut self, session_id: Uuid, kind: WizardEventKind) -> WizardEvent;
    /// Lista eventos de una sesión (orden ascendente por seq).
    fn list(&self, session_id: Uuid) -> Vec<WizardEvent>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    pub inner: HashMap<Uuid, Vec<WizardEvent>>,
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&mut self, session_id: Uuid, kind: WizardEventKind) -> WizardEvent {
        let vec = self.inner.entry(session_id).or_default();
        let seq = vec.len() as u64;
        let ev = WizardEvent { seq, session_id, kind, ts: Utc::now() };
        vec.push(ev.clone());
        ev
    }

    fn list(&self, session_id: Uuid) -> Vec<WizardEvent> {
        self.inner.get(&session_id).cloned().unwrap_or_default()
    }
}
