//! Ejecutor en proceso que registra cada llamada en lugar de tocar el
//! sistema. Sirve de backend "dry run" del CLI y de doble en los tests.

use log::info;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use wizard_core::{ExecutorError, PrivilegedExecutor};
use wizard_integrity::{sha256_file, FormatValidator, XzContainer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "target", rename_all = "snake_case")]
pub enum ExecutorCall {
    Restart(String),
    Start(String),
    Stop(String),
    ApplyFirmware(PathBuf),
    ApplyServicePack(PathBuf),
    SetUploadStagingLocation(PathBuf),
    ImportConfig(PathBuf),
    ComputeDigest(PathBuf),
    ValidateContainerFormat(PathBuf),
}

impl ExecutorCall {
    pub fn action(&self) -> &'static str {
        match self {
            ExecutorCall::Restart(_) => "restart",
            ExecutorCall::Start(_) => "start",
            ExecutorCall::Stop(_) => "stop",
            ExecutorCall::ApplyFirmware(_) => "apply_firmware",
            ExecutorCall::ApplyServicePack(_) => "apply_service_pack",
            ExecutorCall::SetUploadStagingLocation(_) => "set_upload_staging_location",
            ExecutorCall::ImportConfig(_) => "import_config",
            ExecutorCall::ComputeDigest(_) => "compute_digest",
            ExecutorCall::ValidateContainerFormat(_) => "validate_container_format",
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<ExecutorCall>>,
    fail_on: HashSet<String>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hace fallar la acción `action` (p.ej. `"apply_firmware"`). La llamada
    /// queda registrada igualmente.
    pub fn failing_on(mut self, action: &str) -> Self {
        self.fail_on.insert(action.to_string());
        self
    }

    fn log(&self) -> MutexGuard<'_, Vec<ExecutorCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<ExecutorCall> {
        self.log().clone()
    }

    pub fn count(&self, action: &str) -> usize {
        self.log().iter().filter(|c| c.action() == action).count()
    }

    fn record(&self, call: ExecutorCall) -> Result<(), ExecutorError> {
        let action = call.action();
        info!("executor: {} {:?}", action, call);
        self.log().push(call);
        if self.fail_on.contains(action) {
            return Err(ExecutorError::new(action, "configured to fail"));
        }
        Ok(())
    }
}

impl PrivilegedExecutor for RecordingExecutor {
    fn restart(&self, service: &str) -> Result<(), ExecutorError> {
        self.record(ExecutorCall::Restart(service.to_string()))
    }

    fn start(&self, service: &str) -> Result<(), ExecutorError> {
        self.record(ExecutorCall::Start(service.to_string()))
    }

    fn stop(&self, service: &str) -> Result<(), ExecutorError> {
        self.record(ExecutorCall::Stop(service.to_string()))
    }

    fn apply_firmware(&self, staging_path: &Path) -> Result<(), ExecutorError> {
        self.record(ExecutorCall::ApplyFirmware(staging_path.to_path_buf()))
    }

    fn apply_service_pack(&self, staging_path: &Path) -> Result<(), ExecutorError> {
        self.record(ExecutorCall::ApplyServicePack(staging_path.to_path_buf()))
    }

    fn set_upload_staging_location(&self, path: &Path) -> Result<(), ExecutorError> {
        self.record(ExecutorCall::SetUploadStagingLocation(path.to_path_buf()))
    }

    fn import_config(&self, staging_path: &Path) -> Result<(), ExecutorError> {
        self.record(ExecutorCall::ImportConfig(staging_path.to_path_buf()))
    }

    fn compute_digest(&self, path: &Path) -> Result<String, ExecutorError> {
        self.record(ExecutorCall::ComputeDigest(path.to_path_buf()))?;
        sha256_file(path).map_err(|e| ExecutorError::new("compute_digest", e.to_string()))
    }

    fn validate_container_format(&self, path: &Path) -> Result<bool, ExecutorError> {
        self.record(ExecutorCall::ValidateContainerFormat(path.to_path_buf()))?;
        XzContainer.validate(path)
                   .map_err(|e| ExecutorError::new("validate_container_format", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn records_calls_in_order_and_fails_on_request() {
        let exec = RecordingExecutor::new().failing_on("restart");
        exec.stop("nginx").unwrap();
        let err = exec.restart("nginx").unwrap_err();
        assert_eq!(err.to_string(), "executor action 'restart' failed: configured to fail");
        assert_eq!(exec.calls(),
                   [ExecutorCall::Stop("nginx".into()), ExecutorCall::Restart("nginx".into())]);
        assert_eq!(exec.count("restart"), 1);
    }

    #[test]
    fn compute_digest_reads_the_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"abc").unwrap();
        let exec = RecordingExecutor::new();
        assert_eq!(exec.compute_digest(f.path()).unwrap(),
                   "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert!(exec.compute_digest(Path::new("/nonexistent/firmware.xz")).is_err());
    }

    #[test]
    fn calls_serialize_with_action_tag() {
        let raw = serde_json::to_value(ExecutorCall::ApplyFirmware(PathBuf::from("/mnt/tank/firmware.xz"))).unwrap();
        assert_eq!(raw, serde_json::json!({"action": "apply_firmware", "target": "/mnt/tank/firmware.xz"}));
    }
}
