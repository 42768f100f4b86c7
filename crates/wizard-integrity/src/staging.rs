//! Área de staging y locks por tipo de artifact.
//!
//! La ruta de staging es fija por tipo (`<root>/<kind.file_name()>`), así que
//! dos sesiones que suben el mismo tipo a la vez se pisarían. `StagingLocks`
//! garantiza a lo sumo un staging en vuelo por tipo, para todo el appliance;
//! con `LockPolicy::Reject` el segundo intento falla con `Conflict`, con
//! `LockPolicy::Block` espera a que el primero termine.

use log::debug;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::IntegrityError;
use crate::kind::ArtifactKind;

/// Directorio donde se colocan los artifacts antes de aplicarlos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    pub fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockPolicy {
    /// Un segundo staging del mismo tipo falla con `Conflict`.
    #[default]
    Reject,
    /// Un segundo staging del mismo tipo espera al primero.
    Block,
}

impl FromStr for LockPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "block" => Ok(Self::Block),
            other => Err(format!("unknown lock policy '{other}' (expected 'reject' or 'block')")),
        }
    }
}

#[derive(Debug, Default)]
pub struct StagingLocks {
    in_flight: Mutex<HashSet<ArtifactKind>>,
    released: Condvar,
    policy: LockPolicy,
}

impl StagingLocks {
    pub fn new(policy: LockPolicy) -> Self {
        Self { in_flight: Mutex::new(HashSet::new()),
               released: Condvar::new(),
               policy }
    }

    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    // El set sólo se modifica con inserciones/borrados atómicos, así que
    // sigue siendo consistente aunque otro hilo haya hecho panic.
    fn set(&self) -> MutexGuard<'_, HashSet<ArtifactKind>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Toma el lock del tipo `kind`. Se libera al soltar el guard.
    pub fn acquire(&self, kind: ArtifactKind) -> Result<StagingGuard<'_>, IntegrityError> {
        let set = self.set();
        if set.contains(&kind) && self.policy == LockPolicy::Reject {
            return Err(IntegrityError::Conflict(kind));
        }
        Ok(self.wait_and_take(set, kind))
    }

    /// Toma el lock esperando siempre, sea cual sea la política. Lo usa quien
    /// ya tiene un artifact verificado y sólo necesita que nadie lo pise
    /// mientras lo aplica.
    pub fn acquire_blocking(&self, kind: ArtifactKind) -> StagingGuard<'_> {
        let set = self.set();
        self.wait_and_take(set, kind)
    }

    fn wait_and_take<'a>(&'a self, mut set: MutexGuard<'a, HashSet<ArtifactKind>>, kind: ArtifactKind) -> StagingGuard<'a> {
        if set.contains(&kind) {
            debug!("waiting for in-flight {} staging", kind);
        }
        while set.contains(&kind) {
            set = self.released.wait(set).unwrap_or_else(PoisonError::into_inner);
        }
        set.insert(kind);
        StagingGuard { locks: self, kind }
    }

    pub fn is_locked(&self, kind: ArtifactKind) -> bool {
        self.set().contains(&kind)
    }

    fn release(&self, kind: ArtifactKind) {
        self.set().remove(&kind);
        self.released.notify_all();
    }
}

/// Guard RAII de un staging en vuelo.
#[derive(Debug)]
pub struct StagingGuard<'a> {
    locks: &'a StagingLocks,
    kind: ArtifactKind,
}

impl StagingGuard<'_> {
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }
}

impl Drop for StagingGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(self.kind);
    }
}
