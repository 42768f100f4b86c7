//! Contrato del ejecutor privilegiado.
//!
//! El core nunca reinicia servicios ni flashea firmware por sí mismo: sólo
//! llama a esta interfaz con rutas de artifacts ya verificados. Cualquier
//! operación puede fallar con `ExecutorError`; no se reintenta internamente.

use std::path::Path;

pub use crate::errors::ExecutorError;

pub trait PrivilegedExecutor: Send + Sync {
    fn restart(&self, service: &str) -> Result<(), ExecutorError>;

    fn start(&self, service: &str) -> Result<(), ExecutorError>;

    fn stop(&self, service: &str) -> Result<(), ExecutorError>;

    /// Flashea la imagen de firmware ubicada en `staging_path`.
    fn apply_firmware(&self, staging_path: &Path) -> Result<(), ExecutorError>;

    fn apply_service_pack(&self, staging_path: &Path) -> Result<(), ExecutorError>;

    /// Fija el directorio donde el sistema coloca uploads temporales.
    fn set_upload_staging_location(&self, path: &Path) -> Result<(), ExecutorError>;

    fn import_config(&self, staging_path: &Path) -> Result<(), ExecutorError>;

    /// Digest hexadecimal (sha256) de un archivo existente.
    fn compute_digest(&self, path: &Path) -> Result<String, ExecutorError>;

    fn validate_container_format(&self, path: &Path) -> Result<bool, ExecutorError>;
}
