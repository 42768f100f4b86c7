//! wizard-steps: steps concretos del appliance y los wizards estándar.
//!
//! - `StagingLocationStep`: elige el punto de montaje donde se colocan los
//!   uploads.
//! - `ArtifactUploadStep`: firmware, service pack o base de configuración,
//!   verificados por el `IntegrityPipeline` y aplicados tras el commit.
//! - `RecordingExecutor`: ejecutor en proceso que registra cada llamada.

pub mod executor;
pub mod location;
pub mod mountpoint;
pub mod upload;
pub mod wizards;

pub use executor::{ExecutorCall, RecordingExecutor};
pub use location::StagingLocationStep;
pub use mountpoint::MountPoint;
pub use upload::{ArtifactUploadStep, FormatCheck};
pub use wizards::{config_wizard, firmware_wizard, service_pack_wizard};
