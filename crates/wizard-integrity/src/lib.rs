//! wizard-integrity: pipeline de integridad para artifacts subidos.
//!
//! Este crate provee:
//! - `IntegrityPipeline`: vuelca un stream a un archivo de staging por
//!   chunks, calcula su sha256 en el camino, lo compara con el digest
//!   declarado y sólo entonces valida el formato del contenedor.
//! - `StagingLocks`: a lo sumo una operación de staging en vuelo por tipo de
//!   artifact (la ruta de staging es fija por tipo).
//! - Validadores de formato (`XzContainer`, `SqliteDatabase`, ejecutor).
//!
//! El pipeline nunca ejecuta acciones privilegiadas: devuelve la ruta del
//! artifact verificado y el llamador se la pasa al ejecutor.

pub mod artifact;
pub mod digest;
pub mod error;
pub mod kind;
pub mod pipeline;
pub mod staging;
pub mod validator;

pub use artifact::{RejectReason, StagedArtifact, Verdict};
pub use digest::{digests_match, sha256_file, DigestAccumulator};
pub use error::IntegrityError;
pub use kind::ArtifactKind;
pub use pipeline::{IntegrityPipeline, PipelineConfig, DEFAULT_CHUNK_SIZE, DEFAULT_STAGING_ROOT};
pub use staging::{LockPolicy, StagingArea, StagingGuard, StagingLocks};
pub use validator::{default_validator, ExecutorFormatValidator, FormatValidator, SqliteDatabase, XzContainer};
