//! `IntegrityPipeline`: stream → staging → digest → formato → veredicto.

use log::{debug, error, info, warn};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::artifact::{RejectReason, StagedArtifact};
use crate::digest::{digests_match, DigestAccumulator};
use crate::error::IntegrityError;
use crate::kind::ArtifactKind;
use crate::staging::{LockPolicy, StagingArea, StagingLocks};
use crate::validator::{executor_failure, FormatValidator};

pub const DEFAULT_STAGING_ROOT: &str = "/var/tmp/firmware";
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Área usada cuando el llamador no indica otra.
    pub staging_root: PathBuf,
    /// Tamaño máximo de cada lectura del stream.
    pub chunk_size: usize,
    pub lock_policy: LockPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { staging_root: PathBuf::from(DEFAULT_STAGING_ROOT),
               chunk_size: DEFAULT_CHUNK_SIZE,
               lock_policy: LockPolicy::default() }
    }
}

/// Pipeline de integridad. Clonarlo comparte los locks: todos los clones
/// serializan el staging del mismo tipo.
#[derive(Debug, Clone)]
pub struct IntegrityPipeline {
    default_area: StagingArea,
    chunk_size: usize,
    locks: Arc<StagingLocks>,
}

impl IntegrityPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { default_area: StagingArea::new(config.staging_root),
               chunk_size: config.chunk_size.max(1),
               locks: Arc::new(StagingLocks::new(config.lock_policy)) }
    }

    pub fn default_area(&self) -> &StagingArea {
        &self.default_area
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn locks(&self) -> &StagingLocks {
        &self.locks
    }

    /// Verifica en el área por defecto.
    pub fn verify<R: Read>(&self,
                           kind: ArtifactKind,
                           stream: R,
                           declared_digest: &str,
                           validator: &dyn FormatValidator)
                           -> Result<StagedArtifact, IntegrityError> {
        let area = self.default_area.clone();
        self.verify_in(&area, kind, stream, declared_digest, validator)
    }

    /// Vuelca `stream` a `<area>/<kind.file_name()>`, calcula el digest en el
    /// camino y, si coincide con `declared_digest`, valida el formato.
    ///
    /// Un rechazo (digest o formato) devuelve `Ok` con veredicto `Rejected` y
    /// el archivo ya borrado. `Err` queda para fallos de infraestructura
    /// (`StagingIo`, `Conflict`); también en ese caso no queda archivo
    /// parcial.
    pub fn verify_in<R: Read>(&self,
                              area: &StagingArea,
                              kind: ArtifactKind,
                              stream: R,
                              declared_digest: &str,
                              validator: &dyn FormatValidator)
                              -> Result<StagedArtifact, IntegrityError> {
        let _guard = self.locks.acquire(kind)?;
        let path = area.path_for(kind);
        let mut artifact = StagedArtifact::pending(kind, declared_digest, path.clone());
        debug!("staging {} into {}", kind, path.display());

        let (computed, bytes) = match self.stream_to_staging(area, &path, stream) {
            Ok(v) => v,
            Err(source) => {
                error!("staging of {} failed: {}", kind, source);
                discard(&path);
                return Err(IntegrityError::StagingIo { path, source });
            }
        };
        artifact.streamed(computed, bytes);

        let computed = artifact.computed_digest().unwrap_or_default();
        if !digests_match(declared_digest, computed) {
            warn!("{} rejected: checksum mismatch ({} bytes)", kind, bytes);
            artifact.reject(RejectReason::ChecksumMismatch);
            discard(&path);
            return Ok(artifact);
        }

        match validator.validate(&path) {
            Ok(true) => {}
            Ok(false) => {
                warn!("{} rejected: invalid container format", kind);
                artifact.reject(RejectReason::InvalidFormat);
                discard(&path);
                return Ok(artifact);
            }
            Err(source) => {
                error!("format validation of {} could not run: {}", kind, source);
                discard(&path);
                return Err(match executor_failure(&source) {
                               Some(e) => IntegrityError::Executor(e),
                               None => IntegrityError::StagingIo { path, source },
                           });
            }
        }

        artifact.verify();
        info!("{} verified ({} bytes) at {}", kind, bytes, path.display());
        Ok(artifact)
    }

    fn stream_to_staging<R: Read>(&self, area: &StagingArea, path: &Path, mut stream: R) -> io::Result<(String, u64)> {
        area.ensure_root()?;
        let mut file = File::create(path)?;
        let mut acc = DigestAccumulator::new();
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            let n = match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            file.write_all(&buf[..n])?;
            acc.update(&buf[..n]);
        }
        file.sync_all()?;
        let bytes = acc.bytes();
        Ok((acc.finalize(), bytes))
    }
}

/// Borra un archivo de staging; que no exista no es un error.
fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("removed staging file {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("could not remove staging file {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Verdict;
    use crate::digest::DigestAccumulator;
    use std::io::Cursor;

    fn pipeline(root: &Path, chunk: usize) -> IntegrityPipeline {
        IntegrityPipeline::new(PipelineConfig { staging_root: root.to_path_buf(),
                                                chunk_size: chunk,
                                                lock_policy: LockPolicy::Reject })
    }

    fn digest_of(bytes: &[u8]) -> String {
        let mut acc = DigestAccumulator::new();
        acc.update(bytes);
        acc.finalize()
    }

    /// Reader que falla tras entregar algunos bytes.
    struct Broken {
        sent: bool,
    }

    impl Read for Broken {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"xz!!");
            Ok(4)
        }
    }

    #[test]
    fn small_chunks_still_produce_the_full_digest() {
        let dir = tempfile::tempdir().unwrap();
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let p = pipeline(dir.path(), 7);
        let art = p.verify(ArtifactKind::Firmware, Cursor::new(data.clone()), &digest_of(&data), &|_: &Path| true)
                   .unwrap();
        assert_eq!(art.verdict(), Verdict::Verified);
        assert_eq!(art.bytes_written(), data.len() as u64);
        assert_eq!(std::fs::read(art.staging_path()).unwrap(), data);
        assert!(!p.locks().is_locked(ArtifactKind::Firmware));
    }

    #[test]
    fn io_failure_removes_partial_file_and_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), 1024);
        let err = p.verify(ArtifactKind::ServicePack, Broken { sent: false }, "00", &|_: &Path| true)
                   .unwrap_err();
        assert!(matches!(err, IntegrityError::StagingIo { .. }));
        assert!(!dir.path().join("servicepack.txz").exists());
        assert!(!p.locks().is_locked(ArtifactKind::ServicePack));
    }

    #[test]
    fn validator_is_not_run_when_digest_mismatches() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), 1024);
        let called = std::sync::atomic::AtomicBool::new(false);
        let validator = |_: &Path| {
            called.store(true, std::sync::atomic::Ordering::SeqCst);
            true
        };
        let art = p.verify(ArtifactKind::Config, Cursor::new(b"abc".to_vec()), &digest_of(b"abd"), &validator)
                   .unwrap();
        assert_eq!(art.rejection(), Some(RejectReason::ChecksumMismatch));
        assert!(!art.format_valid());
        assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn concurrent_same_kind_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), 1024);
        let _held = p.locks().acquire(ArtifactKind::Firmware).unwrap();
        let err = p.clone()
                   .verify(ArtifactKind::Firmware, Cursor::new(vec![1u8]), &digest_of(&[1]), &|_: &Path| true)
                   .unwrap_err();
        assert!(matches!(err, IntegrityError::Conflict(ArtifactKind::Firmware)));
        // un tipo distinto no colisiona
        let ok = p.verify(ArtifactKind::Config, Cursor::new(vec![1u8]), &digest_of(&[1]), &|_: &Path| true)
                  .unwrap();
        assert!(ok.is_verified());
    }
}
