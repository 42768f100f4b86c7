//! Engine module for WizardEngine implementation
//!
//! Provides the engine, its builder and the completion hook for multi-step
//! wizards whose state travels between requests.

pub mod builder;
pub mod completion;
pub mod core;

pub use self::core::WizardEngine;
pub use builder::WizardBuilder;
pub use completion::{Completion, ReturnLastOutcome};
