//! Tipos de artifact aceptados y sus nombres de staging fijos.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Firmware,
    ServicePack,
    Config,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [Self::Firmware, Self::ServicePack, Self::Config];

    /// Nombre del archivo de staging. Distinto por tipo para que uploads de
    /// tipos diferentes no colisionen.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Firmware => "firmware.xz",
            Self::ServicePack => "servicepack.txz",
            Self::Config => "config.db",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Firmware => "firmware",
            Self::ServicePack => "service pack",
            Self::Config => "config",
        }
    }

    /// Mensaje estable que ve el usuario cuando el artifact se rechaza (por
    /// digest o por formato; no se distingue a propósito).
    pub fn rejection_message(self) -> String {
        format!("Invalid {} or checksum", self.label())
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
