//! wizard-core: motor de wizards multi-step con tokens de integridad.
//!
//! El motor secuencia steps a través de peticiones independientes. Cada step
//! commiteado queda firmado con un token (blake3 con clave) que encadena al
//! anterior; el siguiente envío sólo se acepta si todos los tokens previos
//! verifican. Los archivos grandes se validan una sola vez y después viaja
//! sólo su resumen firmado.
pub mod constants;
pub mod definition;
pub mod engine;
pub mod errors;
pub mod event;
pub mod executor;
pub mod hashing;
pub mod model;
pub mod step;

pub use definition::WizardDefinition;
pub use engine::{Completion, ReturnLastOutcome, WizardBuilder, WizardEngine};
pub use errors::{ExecutorError, WizardError};
pub use event::{EventStore, InMemoryEventStore, WizardEvent, WizardEventKind};
pub use executor::PrivilegedExecutor;
pub use hashing::TokenSigner;
pub use model::{FieldErrors, FieldKind, FieldMap, FieldSpec, FileMap, SessionStatus, StepData, StepForm, WizardRequest,
                WizardSession};
pub use step::{AfterCommit, CompletionResult, StepDefinition, StepResult, StepValidation, ValidationContext};
