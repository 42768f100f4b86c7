//! Definición inmutable del wizard: lista ordenada de steps + hash.
//!
//! El `definition_hash` identifica la secuencia de steps (ids en orden y
//! versión del motor). Una sesión queda ligada a él al crearse.

use serde_json::json;
use std::collections::HashSet;
use std::fmt;

use crate::constants::ENGINE_VERSION;
use crate::errors::WizardError;
use crate::hashing::hash_value;
use crate::step::StepDefinition;

pub struct WizardDefinition {
    steps: Vec<Box<dyn StepDefinition>>,
    definition_hash: String,
}

impl WizardDefinition {
    /// Construye la definición. Un wizard sin steps o con ids repetidos es
    /// una configuración inválida.
    pub fn new(steps: Vec<Box<dyn StepDefinition>>) -> Result<Self, WizardError> {
        if steps.is_empty() {
            return Err(WizardError::Configuration("wizard must declare at least one step".into()));
        }
        let mut seen = HashSet::new();
        for s in &steps {
            if !seen.insert(s.id().to_string()) {
                return Err(WizardError::Configuration(format!("duplicated step id '{}'", s.id())));
            }
        }
        let ids: Vec<&str> = steps.iter().map(|s| s.id()).collect();
        let definition_hash = hash_value(&json!({
            "engine_version": ENGINE_VERSION,
            "step_ids": ids,
        }));
        Ok(Self { steps, definition_hash })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn definition_hash(&self) -> &str {
        &self.definition_hash
    }

    pub fn step(&self, index: usize) -> Option<&dyn StepDefinition> {
        self.steps.get(index).map(|s| s.as_ref())
    }

    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id()).collect()
    }
}

impl fmt::Debug for WizardDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardDefinition")
         .field("steps", &self.step_ids())
         .field("definition_hash", &self.definition_hash)
         .finish()
    }
}
