//! Modelos del wizard: campos enviados, formularios, sesión y petición.

pub mod fields;
pub mod form;
pub mod request;
pub mod session;

pub use fields::{FieldErrors, FieldMap, FileMap, FileStream, StepData, NON_FIELD_ERRORS};
pub use form::{FieldKind, FieldSpec, StepForm};
pub use request::WizardRequest;
pub use session::{SessionStatus, WizardSession};
