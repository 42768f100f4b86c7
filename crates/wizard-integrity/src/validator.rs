//! Validadores de formato post-stream.
//!
//! Se ejecutan sólo cuando el digest ya coincide y el archivo de staging
//! está completo en disco.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use wizard_core::{ExecutorError, PrivilegedExecutor};

use crate::kind::ArtifactKind;

pub trait FormatValidator: Send + Sync {
    /// `Ok(false)` = formato inválido; `Err` = no se pudo inspeccionar.
    fn validate(&self, path: &Path) -> io::Result<bool>;
}

impl<F> FormatValidator for F where F: Fn(&Path) -> bool + Send + Sync
{
    fn validate(&self, path: &Path) -> io::Result<bool> {
        Ok(self(path))
    }
}

const XZ_HEADER_MAGIC: [u8; 6] = [0xFD, b'7', b'z', b'X', b'Z', 0x00];
const XZ_FOOTER_MAGIC: [u8; 2] = *b"YZ";
// header (12) + index mínimo (8) + footer (12)
const XZ_MIN_LEN: u64 = 32;

/// Contenedor xz: magic de cabecera, magic de pie y flags de stream
/// idénticos en ambos extremos. No descomprime.
#[derive(Debug, Clone, Copy, Default)]
pub struct XzContainer;

impl FormatValidator for XzContainer {
    fn validate(&self, path: &Path) -> io::Result<bool> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        if len < XZ_MIN_LEN {
            return Ok(false);
        }
        let mut header = [0u8; 12];
        file.read_exact(&mut header)?;
        if header[..6] != XZ_HEADER_MAGIC {
            return Ok(false);
        }
        let mut footer = [0u8; 12];
        file.seek(SeekFrom::End(-12))?;
        file.read_exact(&mut footer)?;
        // footer = crc32(4) backward_size(4) stream_flags(2) magic(2)
        Ok(footer[10..] == XZ_FOOTER_MAGIC && footer[8..10] == header[6..8])
    }
}

const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// Base de configuración: cabecera de base de datos sqlite.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDatabase;

impl FormatValidator for SqliteDatabase {
    fn validate(&self, path: &Path) -> io::Result<bool> {
        let mut file = File::open(path)?;
        let mut header = [0u8; 16];
        match file.read_exact(&mut header) {
            Ok(()) => Ok(&header == SQLITE_MAGIC),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Delega la validación en el ejecutor privilegiado
/// (`validate_container_format`).
#[derive(Clone)]
pub struct ExecutorFormatValidator {
    executor: Arc<dyn PrivilegedExecutor>,
}

impl ExecutorFormatValidator {
    pub fn new(executor: Arc<dyn PrivilegedExecutor>) -> Self {
        Self { executor }
    }
}

impl FormatValidator for ExecutorFormatValidator {
    /// Un fallo del ejecutor viaja dentro del `io::Error`; el pipeline lo
    /// recupera con `executor_failure`.
    fn validate(&self, path: &Path) -> io::Result<bool> {
        self.executor.validate_container_format(path).map_err(io::Error::other)
    }
}

/// Extrae el `ExecutorError` envuelto por `ExecutorFormatValidator`, si lo hay.
pub(crate) fn executor_failure(err: &io::Error) -> Option<ExecutorError> {
    err.get_ref().and_then(|inner| inner.downcast_ref::<ExecutorError>()).cloned()
}

/// Validador por defecto de cada tipo de artifact.
pub fn default_validator(kind: ArtifactKind) -> Box<dyn FormatValidator> {
    match kind {
        ArtifactKind::Firmware | ArtifactKind::ServicePack => Box::new(XzContainer),
        ArtifactKind::Config => Box::new(SqliteDatabase),
    }
}
