use thiserror::Error;
use wizard_core::WizardError;
use wizard_integrity::IntegrityError;

/// Errores de la capa de aplicación (configuración y ensamblado).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error de configuración: {0}")]
    Config(String),
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
}
