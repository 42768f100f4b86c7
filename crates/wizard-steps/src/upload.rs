//! Steps de subida de artifacts (firmware, service pack, configuración).
//!
//! El archivo se verifica durante la validación del step: sólo un artifact
//! con digest correcto y formato válido llega a commitearse, y lo que queda
//! en la sesión es su resumen (digest, ruta, tamaño), nunca el contenido.

use log::{debug, info, warn};
use serde_json::{json, Value};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use wizard_core::constants::REQUIRED_FIELD_MESSAGE;
use wizard_core::{AfterCommit, ExecutorError, FieldErrors, FieldKind, FieldMap, FieldSpec, FileMap,
                  PrivilegedExecutor, StepData, StepDefinition, StepForm, StepValidation, ValidationContext,
                  WizardError};
use wizard_integrity::{default_validator, digests_match, sha256_file, ArtifactKind, ExecutorFormatValidator,
                       FormatValidator, IntegrityPipeline, StagingArea};

use crate::location::MOUNTPOINT_FIELD;

pub const SHA256_FIELD: &str = "sha256";

/// Nombre del campo de archivo para cada tipo.
pub fn file_field(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Firmware => "firmware",
        ArtifactKind::ServicePack => "servicepack",
        ArtifactKind::Config => "config",
    }
}

/// Quién valida el formato del contenedor una vez que el digest coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatCheck {
    /// Validadores en proceso (`XzContainer`, `SqliteDatabase`).
    #[default]
    Builtin,
    /// `PrivilegedExecutor::validate_container_format`.
    Executor,
}

impl FromStr for FormatCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "builtin" => Ok(Self::Builtin),
            "executor" => Ok(Self::Executor),
            other => Err(format!("unknown format check '{other}' (expected 'builtin' or 'executor')")),
        }
    }
}

pub struct ArtifactUploadStep {
    kind: ArtifactKind,
    pipeline: IntegrityPipeline,
    validator: Box<dyn FormatValidator>,
    executor: Arc<dyn PrivilegedExecutor>,
}

impl ArtifactUploadStep {
    pub fn new(kind: ArtifactKind, pipeline: IntegrityPipeline, executor: Arc<dyn PrivilegedExecutor>) -> Self {
        Self { kind,
               pipeline,
               validator: default_validator(kind),
               executor }
    }

    pub fn firmware(pipeline: IntegrityPipeline, executor: Arc<dyn PrivilegedExecutor>) -> Self {
        Self::new(ArtifactKind::Firmware, pipeline, executor)
    }

    pub fn service_pack(pipeline: IntegrityPipeline, executor: Arc<dyn PrivilegedExecutor>) -> Self {
        Self::new(ArtifactKind::ServicePack, pipeline, executor)
    }

    pub fn config(pipeline: IntegrityPipeline, executor: Arc<dyn PrivilegedExecutor>) -> Self {
        Self::new(ArtifactKind::Config, pipeline, executor)
    }

    /// Sustituye el validador de formato por defecto del tipo.
    pub fn with_validator<V>(mut self, validator: V) -> Self
        where V: FormatValidator + 'static
    {
        self.with_validator_boxed(Box::new(validator))
    }

    pub fn format_check(self, check: FormatCheck) -> Self {
        match check {
            FormatCheck::Builtin => {
                let kind = self.kind;
                self.with_validator_boxed(default_validator(kind))
            }
            FormatCheck::Executor => {
                let validator = ExecutorFormatValidator::new(self.executor.clone());
                self.with_validator(validator)
            }
        }
    }

    fn with_validator_boxed(mut self, validator: Box<dyn FormatValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    fn file_label(&self) -> &'static str {
        match self.kind {
            ArtifactKind::Firmware => "New image to be installed",
            ArtifactKind::ServicePack => "Service Pack image to be installed",
            ArtifactKind::Config => "New config to be installed",
        }
    }

    /// Área de staging: la ubicación commiteada en un step anterior, o la
    /// del pipeline si el wizard no tiene step de ubicación.
    fn staging_area(&self, ctx: &ValidationContext<'_>) -> StagingArea {
        match ctx.lookup(MOUNTPOINT_FIELD).and_then(Value::as_str) {
            Some(mount) => StagingArea::new(mount),
            None => self.pipeline.default_area().clone(),
        }
    }
}

impl StepDefinition for ArtifactUploadStep {
    fn id(&self) -> &str {
        file_field(self.kind)
    }

    fn name(&self) -> &str {
        self.kind.label()
    }

    fn form(&self) -> StepForm {
        StepForm::new(self.id(),
                      vec![FieldSpec::new(file_field(self.kind), self.file_label(), FieldKind::File),
                           FieldSpec::new(SHA256_FIELD, "SHA256 sum for the image", FieldKind::Text)])
    }

    fn validate(&self, ctx: &ValidationContext<'_>, fields: &FieldMap, files: &mut FileMap) -> Result<StepValidation, WizardError> {
        let field = file_field(self.kind);
        let mut errors = FieldErrors::new();
        let declared = fields.get(SHA256_FIELD).map(|v| v.trim()).filter(|v| !v.is_empty());
        if declared.is_none() {
            errors.add(SHA256_FIELD, REQUIRED_FIELD_MESSAGE);
        }
        let stream = files.remove(field);
        if stream.is_none() {
            errors.add(field, REQUIRED_FIELD_MESSAGE);
        }
        let (declared, stream) = match (declared, stream) {
            (Some(d), Some(s)) => (d, s),
            _ => return Ok(StepValidation::invalid(errors)),
        };

        let area = self.staging_area(ctx);
        debug!("session {}: verifying {} under {}", ctx.session_id, self.kind, area.root().display());
        let artifact = self.pipeline.verify_in(&area, self.kind, stream, declared, self.validator.as_ref())?;
        let artifact = match artifact.into_verified() {
            Ok(a) => a,
            Err(e) if e.is_rejection() => return Ok(StepValidation::invalid(errors.with(field, e.to_string()))),
            Err(e) => return Err(e.into()),
        };

        let mut cleaned = StepData::new();
        cleaned.insert("kind".to_string(), json!(self.kind));
        cleaned.insert(SHA256_FIELD.to_string(), json!(artifact.computed_digest()));
        cleaned.insert("staging_path".to_string(), json!(artifact.staging_path().display().to_string()));
        cleaned.insert("bytes".to_string(), json!(artifact.bytes_written()));
        Ok(StepValidation::valid(cleaned))
    }

    fn after_commit(&self) -> Option<&dyn AfterCommit> {
        Some(self)
    }
}

impl AfterCommit for ArtifactUploadStep {
    fn after_commit(&self, data: &StepData) -> Result<Option<Value>, ExecutorError> {
        let action = match self.kind {
            ArtifactKind::Firmware => "apply_firmware",
            ArtifactKind::ServicePack => "apply_service_pack",
            ArtifactKind::Config => "import_config",
        };
        let staging_path = data.get("staging_path")
                               .and_then(Value::as_str)
                               .ok_or_else(|| ExecutorError::new(action, "no staged artifact committed"))?;
        let path = Path::new(staging_path);
        let committed = data.get(SHA256_FIELD)
                            .and_then(Value::as_str)
                            .ok_or_else(|| ExecutorError::new(action, "no digest committed"))?;

        // La ruta de staging es fija por tipo: mientras se aplica, ningún otro
        // staging del mismo tipo puede reescribirla.
        let _guard = self.pipeline.locks().acquire_blocking(self.kind);
        let current = sha256_file(path).map_err(|e| {
                                           ExecutorError::new(action, format!("staged {} unreadable: {e}", self.kind))
                                       })?;
        if !digests_match(committed, &current) {
            warn!("{} at {} changed after verification; not applying", self.kind, staging_path);
            return Err(ExecutorError::new(action, format!("staged {} changed after verification", self.kind)));
        }
        match self.kind {
            ArtifactKind::Firmware => self.executor.apply_firmware(path)?,
            ArtifactKind::ServicePack => self.executor.apply_service_pack(path)?,
            ArtifactKind::Config => self.executor.import_config(path)?,
        }
        info!("{} applied from {}", self.kind, staging_path);
        Ok(Some(json!({ "applied": self.kind,
                        "staging_path": staging_path,
                        "sha256": data.get(SHA256_FIELD) })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RecordingExecutor;
    use std::collections::BTreeMap;
    use std::io::Cursor;
    use wizard_integrity::{DigestAccumulator, LockPolicy, PipelineConfig};

    fn sha256(bytes: &[u8]) -> String {
        let mut acc = DigestAccumulator::new();
        acc.update(bytes);
        acc.finalize()
    }

    fn step(root: &Path) -> ArtifactUploadStep {
        let pipeline = IntegrityPipeline::new(PipelineConfig { staging_root: root.to_path_buf(),
                                                               chunk_size: 64,
                                                               lock_policy: LockPolicy::Reject });
        ArtifactUploadStep::service_pack(pipeline, Arc::new(RecordingExecutor::new())).with_validator(|_: &Path| true)
    }

    #[test]
    fn missing_file_and_digest_are_both_reported() {
        let dir = tempfile::tempdir().unwrap();
        let committed = BTreeMap::new();
        let ctx = ValidationContext::new(Default::default(), 0, &committed);
        let v = step(dir.path()).validate(&ctx, &FieldMap::new(), &mut FileMap::new()).unwrap();
        assert_eq!(v.errors.get("servicepack"), [REQUIRED_FIELD_MESSAGE.to_string()]);
        assert_eq!(v.errors.get(SHA256_FIELD), [REQUIRED_FIELD_MESSAGE.to_string()]);
    }

    #[test]
    fn verified_upload_commits_only_its_summary() {
        let dir = tempfile::tempdir().unwrap();
        let committed = BTreeMap::new();
        let ctx = ValidationContext::new(Default::default(), 0, &committed);
        let body = b"service pack payload".to_vec();
        let mut fields = FieldMap::new();
        fields.insert(SHA256_FIELD.into(), sha256(&body));
        let mut files = FileMap::new();
        files.insert("servicepack".into(), Box::new(Cursor::new(body.clone())));

        let v = step(dir.path()).validate(&ctx, &fields, &mut files).unwrap();
        assert!(v.is_valid());
        assert_eq!(v.cleaned["kind"], json!("service_pack"));
        assert_eq!(v.cleaned["bytes"], json!(body.len()));
        assert_eq!(v.cleaned["staging_path"],
                   json!(dir.path().join("servicepack.txz").display().to_string()));
    }

    #[test]
    fn replaced_staging_file_is_not_applied() {
        let dir = tempfile::tempdir().unwrap();
        let exec = Arc::new(RecordingExecutor::new());
        let pipeline = IntegrityPipeline::new(PipelineConfig { staging_root: dir.path().to_path_buf(),
                                                               ..PipelineConfig::default() });
        let s = ArtifactUploadStep::firmware(pipeline, exec.clone()).with_validator(|_: &Path| true);
        let committed = BTreeMap::new();
        let ctx = ValidationContext::new(Default::default(), 0, &committed);
        let body = b"verified firmware".to_vec();
        let mut fields = FieldMap::new();
        fields.insert(SHA256_FIELD.into(), sha256(&body));
        let mut files = FileMap::new();
        files.insert("firmware".into(), Box::new(Cursor::new(body)));
        let data = s.validate(&ctx, &fields, &mut files).unwrap().cleaned;

        std::fs::write(dir.path().join("firmware.xz"), b"something else").unwrap();
        let err = AfterCommit::after_commit(&s, &data).unwrap_err();
        assert_eq!(err.action, "apply_firmware");
        assert!(err.message.contains("changed after verification"), "{err}");

        std::fs::remove_file(dir.path().join("firmware.xz")).unwrap();
        assert!(AfterCommit::after_commit(&s, &data).is_err());
        assert_eq!(exec.count("apply_firmware"), 0);
    }

    #[test]
    fn format_check_parses() {
        assert_eq!("Executor".parse::<FormatCheck>().unwrap(), FormatCheck::Executor);
        assert_eq!(" builtin".parse::<FormatCheck>().unwrap(), FormatCheck::Builtin);
        assert!("magic".parse::<FormatCheck>().is_err());
    }

    #[test]
    fn committed_mountpoint_overrides_default_area() {
        let default_root = tempfile::tempdir().unwrap();
        let mount = tempfile::tempdir().unwrap();
        let mut location = StepData::new();
        location.insert(MOUNTPOINT_FIELD.into(), json!(mount.path().display().to_string()));
        let committed = BTreeMap::from([(0usize, location)]);
        let ctx = ValidationContext::new(Default::default(), 1, &committed);

        let s = step(default_root.path());
        assert_eq!(s.staging_area(&ctx).root(), mount.path());
    }
}
