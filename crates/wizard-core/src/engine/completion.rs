//! Completion: se ejecuta una única vez, cuando el último step commitea.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::WizardError;
use crate::model::StepData;
use crate::step::CompletionResult;

pub trait Completion: Send + Sync {
    /// Recibe todos los datos commiteados y el valor devuelto por el
    /// `after_commit` del último step (si lo tiene).
    fn complete(&self,
                committed: &BTreeMap<usize, StepData>,
                last_outcome: Option<Value>)
                -> Result<CompletionResult, WizardError>;
}

/// Completion por defecto: el resultado del wizard es el valor devuelto por
/// la acción del último step.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnLastOutcome;

impl Completion for ReturnLastOutcome {
    fn complete(&self,
                committed: &BTreeMap<usize, StepData>,
                last_outcome: Option<Value>)
                -> Result<CompletionResult, WizardError> {
        Ok(CompletionResult { outcome: last_outcome,
                              committed_steps: committed.len() })
    }
}

impl<F> Completion for F
    where F: Fn(&BTreeMap<usize, StepData>, Option<Value>) -> Result<CompletionResult, WizardError> + Send + Sync
{
    fn complete(&self,
                committed: &BTreeMap<usize, StepData>,
                last_outcome: Option<Value>)
                -> Result<CompletionResult, WizardError> {
        self(committed, last_outcome)
    }
}
