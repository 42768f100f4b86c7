//! Step de ubicación temporal de uploads.

use log::info;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

use wizard_core::constants::REQUIRED_FIELD_MESSAGE;
use wizard_core::{AfterCommit, ExecutorError, FieldErrors, FieldKind, FieldMap, FieldSpec, FileMap,
                  PrivilegedExecutor, StepData, StepDefinition, StepForm, StepValidation, ValidationContext,
                  WizardError};

use crate::mountpoint::MountPoint;

pub const MOUNTPOINT_FIELD: &str = "mountpoint";

/// Elige, entre los puntos de montaje disponibles, dónde se colocan los
/// artifacts antes de aplicarlos. Tras el commit se lo comunica al ejecutor.
pub struct StagingLocationStep {
    mounts: Vec<MountPoint>,
    executor: Arc<dyn PrivilegedExecutor>,
}

impl StagingLocationStep {
    pub fn new(mounts: Vec<MountPoint>, executor: Arc<dyn PrivilegedExecutor>) -> Self {
        Self { mounts, executor }
    }

    pub fn mounts(&self) -> &[MountPoint] {
        &self.mounts
    }

    fn choices(&self) -> Vec<String> {
        self.mounts.iter().map(|m| m.to_string()).collect()
    }
}

impl StepDefinition for StagingLocationStep {
    fn id(&self) -> &str {
        "staging_location"
    }

    fn name(&self) -> &str {
        "Temporary location"
    }

    fn form(&self) -> StepForm {
        let field = FieldSpec::new(MOUNTPOINT_FIELD,
                                   "Place to temporarily place firmware file",
                                   FieldKind::Choice { choices: self.choices() })
            .help("The system will use this place to temporarily store the firmware file before it's being applied.");
        StepForm::new(self.id(), vec![field])
    }

    fn validate(&self, _ctx: &ValidationContext<'_>, fields: &FieldMap, _files: &mut FileMap) -> Result<StepValidation, WizardError> {
        let selected = match fields.get(MOUNTPOINT_FIELD).map(|v| v.trim()).filter(|v| !v.is_empty()) {
            Some(v) => v,
            None => {
                return Ok(StepValidation::invalid(FieldErrors::new().with(MOUNTPOINT_FIELD, REQUIRED_FIELD_MESSAGE)))
            }
        };
        if !self.choices().iter().any(|c| c == selected) {
            let msg = format!("Select a valid choice. {} is not one of the available choices.", selected);
            return Ok(StepValidation::invalid(FieldErrors::new().with(MOUNTPOINT_FIELD, msg)));
        }
        let mut cleaned = StepData::new();
        cleaned.insert(MOUNTPOINT_FIELD.to_string(), json!(selected));
        Ok(StepValidation::valid(cleaned))
    }

    fn after_commit(&self) -> Option<&dyn AfterCommit> {
        Some(self)
    }
}

impl AfterCommit for StagingLocationStep {
    fn after_commit(&self, data: &StepData) -> Result<Option<Value>, ExecutorError> {
        let path = data.get(MOUNTPOINT_FIELD)
                       .and_then(Value::as_str)
                       .ok_or_else(|| ExecutorError::new("set_upload_staging_location", "no mountpoint committed"))?;
        self.executor.set_upload_staging_location(Path::new(path))?;
        info!("upload staging location set to {}", path);
        Ok(None)
    }
}
