//! Wizards estándar del appliance: un step de ubicación seguido del upload
//! del artifact. Devuelven el builder para que el llamador fije el firmador,
//! el prefijo o el store de eventos antes de `build`.

use std::sync::Arc;

use wizard_core::{InMemoryEventStore, PrivilegedExecutor, WizardBuilder, WizardEngine};
use wizard_integrity::IntegrityPipeline;

use crate::location::StagingLocationStep;
use crate::mountpoint::MountPoint;
use crate::upload::{ArtifactUploadStep, FormatCheck};

pub fn firmware_wizard(mounts: Vec<MountPoint>,
                       pipeline: IntegrityPipeline,
                       executor: Arc<dyn PrivilegedExecutor>,
                       check: FormatCheck)
                       -> WizardBuilder<InMemoryEventStore> {
    WizardEngine::builder().step(StagingLocationStep::new(mounts, executor.clone()))
                           .step(ArtifactUploadStep::firmware(pipeline, executor).format_check(check))
}

pub fn service_pack_wizard(mounts: Vec<MountPoint>,
                           pipeline: IntegrityPipeline,
                           executor: Arc<dyn PrivilegedExecutor>,
                           check: FormatCheck)
                           -> WizardBuilder<InMemoryEventStore> {
    WizardEngine::builder().step(StagingLocationStep::new(mounts, executor.clone()))
                           .step(ArtifactUploadStep::service_pack(pipeline, executor).format_check(check))
}

/// La base de configuración se sube directamente al área por defecto.
pub fn config_wizard(pipeline: IntegrityPipeline,
                     executor: Arc<dyn PrivilegedExecutor>,
                     check: FormatCheck)
                     -> WizardBuilder<InMemoryEventStore> {
    WizardEngine::builder().step(ArtifactUploadStep::config(pipeline, executor).format_check(check))
}
