//! Definiciones relacionadas a Steps.
//!
//! Un step valida su propio conjunto de campos y, opcionalmente, ejecuta una
//! acción tras ser commiteado. El motor no sabe qué hace cada step: sólo
//! llama a estas dos capacidades.

pub mod definition;
mod result;

pub use definition::{AfterCommit, StepDefinition, StepValidation, ValidationContext};
pub use result::{CompletionResult, StepResult};
