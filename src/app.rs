//! Ensamblado de la aplicación: de `AppConfig` a wizards listos para usar.
//!
//! El pipeline se crea una sola vez y se comparte entre wizards, de modo que
//! los locks de staging cubren todas las sesiones del proceso.

use std::sync::Arc;

use wizard_core::{InMemoryEventStore, PrivilegedExecutor, TokenSigner, WizardBuilder, WizardEngine};
use wizard_integrity::{ArtifactKind, IntegrityPipeline};
use wizard_steps::{config_wizard, firmware_wizard, service_pack_wizard, MountPoint};

use crate::config::AppConfig;
use crate::errors::CoreError;

pub struct Appliance {
    config: AppConfig,
    pipeline: IntegrityPipeline,
    executor: Arc<dyn PrivilegedExecutor>,
}

impl Appliance {
    pub fn new(config: AppConfig, executor: Arc<dyn PrivilegedExecutor>) -> Self {
        let pipeline = IntegrityPipeline::new(config.pipeline_config());
        Self { config,
               pipeline,
               executor }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &IntegrityPipeline {
        &self.pipeline
    }

    pub fn executor(&self) -> &Arc<dyn PrivilegedExecutor> {
        &self.executor
    }

    pub fn signer(&self) -> TokenSigner {
        match &self.config.token_secret {
            Some(secret) => TokenSigner::from_secret(secret),
            None => {
                log::warn!("no token secret configured; sessions will not survive a restart");
                TokenSigner::ephemeral()
            }
        }
    }

    /// Wizard estándar para `kind`. Los de firmware y service pack empiezan
    /// eligiendo uno de `mounts`.
    pub fn wizard(&self, kind: ArtifactKind, mounts: Vec<MountPoint>) -> Result<WizardEngine<InMemoryEventStore>, CoreError> {
        let pipeline = self.pipeline.clone();
        let executor = self.executor.clone();
        let check = self.config.format_check;
        let builder: WizardBuilder<InMemoryEventStore> = match kind {
            ArtifactKind::Firmware => firmware_wizard(mounts, pipeline, executor, check),
            ArtifactKind::ServicePack => service_pack_wizard(mounts, pipeline, executor, check),
            ArtifactKind::Config => config_wizard(pipeline, executor, check),
        };
        let engine = builder.signer(self.signer()).prefix(self.config.field_prefix.clone()).build()?;
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wizard_core::{StepResult, WizardError, WizardRequest};
    use wizard_steps::RecordingExecutor;

    fn appliance(prefix: &str) -> Appliance {
        let cfg = AppConfig { token_secret: Some("unit".into()),
                              field_prefix: prefix.into(),
                              ..AppConfig::default() };
        Appliance::new(cfg, Arc::new(RecordingExecutor::new()))
    }

    #[test]
    fn wizards_use_configured_prefix() {
        let app = appliance("fw");
        let mut engine = app.wizard(ArtifactKind::Firmware, vec![MountPoint::new("/mnt/tank")]).unwrap();
        assert_eq!(engine.step_count(), 2);
        let mut session = engine.start_session();
        let req = WizardRequest::for_step(0).with_field("fw0-mountpoint", "/mnt/tank");
        assert_eq!(engine.handle(&mut session, req).unwrap(), StepResult::Advance { next_step_index: 1 });
    }

    #[test]
    fn configured_secret_makes_sessions_portable_between_engines() {
        let app = appliance("");
        let mut first = app.wizard(ArtifactKind::ServicePack, vec![MountPoint::new("/mnt/tank")]).unwrap();
        let mut session = first.start_session();
        first.handle(&mut session, WizardRequest::for_step(0).with_field("0-mountpoint", "/mnt/tank")).unwrap();

        // otro engine con la misma configuración acepta la sesión
        let mut second = app.wizard(ArtifactKind::ServicePack, vec![MountPoint::new("/mnt/tank")]).unwrap();
        let r = second.handle(&mut session, WizardRequest::for_step(1)).unwrap();
        assert!(!r.is_ok());

        // y uno de otro tipo de wizard no
        let mut other = app.wizard(ArtifactKind::Firmware, vec![MountPoint::new("/mnt/tank")]).unwrap();
        assert!(matches!(other.handle(&mut session, WizardRequest::for_step(1)),
                         Err(WizardError::IntegrityViolation { .. })));
    }
}
