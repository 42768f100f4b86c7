//! Eventos de sesión y store append-only.

pub mod store;
pub mod types;

pub use store::{EventStore, InMemoryEventStore};
pub use types::{WizardEvent, WizardEventKind};
