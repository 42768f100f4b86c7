//! Builder para `WizardEngine`.
//!
//! Acumula los steps en orden y las piezas opcionales (store de eventos,
//! firmador de tokens, completion, prefijo de campos). `build` valida la
//! definición; un wizard vacío es un error de configuración.
//!
//! ```ignore
//! let engine = WizardEngine::builder()
//!     .step(LocationStep::new(..))
//!     .step(UploadStep::firmware(..))
//!     .signer(TokenSigner::from_secret("..."))
//!     .build()?;
//! ```

use crate::definition::WizardDefinition;
use crate::engine::completion::{Completion, ReturnLastOutcome};
use crate::engine::WizardEngine;
use crate::errors::WizardError;
use crate::event::{EventStore, InMemoryEventStore};
use crate::hashing::TokenSigner;
use crate::step::StepDefinition;

pub struct WizardBuilder<E: EventStore> {
    event_store: E,
    steps: Vec<Box<dyn StepDefinition>>,
    signer: Option<TokenSigner>,
    completion: Option<Box<dyn Completion>>,
    prefix: String,
}

impl WizardEngine<InMemoryEventStore> {
    /// Builder con store de eventos en memoria.
    #[inline]
    pub fn builder() -> WizardBuilder<InMemoryEventStore> {
        WizardBuilder::with_store(InMemoryEventStore::default())
    }
}

impl<E: EventStore> WizardBuilder<E> {
    pub fn with_store(event_store: E) -> Self {
        Self { event_store,
               steps: Vec::new(),
               signer: None,
               completion: None,
               prefix: String::new() }
    }

    /// Añade el siguiente step del wizard.
    pub fn step<S>(mut self, step: S) -> Self
        where S: StepDefinition + 'static
    {
        self.steps.push(Box::new(step));
        self
    }

    /// Sin firmador explícito se usa una clave efímera del proceso.
    pub fn signer(mut self, signer: TokenSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn completion<C>(mut self, completion: C) -> Self
        where C: Completion + 'static
    {
        self.completion = Some(Box::new(completion));
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn build(self) -> Result<WizardEngine<E>, WizardError> {
        let definition = WizardDefinition::new(self.steps)?;
        Ok(WizardEngine { definition,
                          signer: self.signer.unwrap_or_else(TokenSigner::ephemeral),
                          completion: self.completion.unwrap_or_else(|| Box::new(ReturnLastOutcome)),
                          event_store: self.event_store,
                          prefix: self.prefix })
    }
}
