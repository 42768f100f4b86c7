use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::errors::{ExecutorError, WizardError};
use crate::model::{FieldErrors, FieldMap, FileMap, StepData, StepForm};

/// Trait que define un step del wizard.
pub trait StepDefinition: Send + Sync {
    /// Identificador estable y único dentro del wizard.
    fn id(&self) -> &str;

    /// Nombre opcional amigable.
    fn name(&self) -> &str { self.id() }

    /// Formulario que el renderer externo debe mostrar para este step.
    fn form(&self) -> StepForm;

    /// Valida los campos (ya sin prefijo) y los archivos enviados.
    ///
    /// Los errores de usuario van en `StepValidation::errors` (el step se
    /// vuelve a mostrar); un `Err` indica un fallo de infraestructura
    /// (staging, conflicto) que no es culpa del formulario.
    fn validate(&self,
                ctx: &ValidationContext<'_>,
                fields: &FieldMap,
                files: &mut FileMap)
                -> Result<StepValidation, WizardError>;

    /// Acción opcional tras el commit. Se consulta una vez por commit.
    fn after_commit(&self) -> Option<&dyn AfterCommit> { None }
}

/// Efecto lateral posterior al commit de un step (p.ej. disparar una acción
/// del ejecutor privilegiado). Devuelve un valor opcional que, en el último
/// step, se entrega a la completion.
pub trait AfterCommit {
    fn after_commit(&self, data: &StepData) -> Result<Option<Value>, ExecutorError>;
}

/// Resultado de `validate`: datos limpios o errores por campo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepValidation {
    pub cleaned: StepData,
    pub errors: FieldErrors,
}

impl StepValidation {
    pub fn valid(cleaned: StepData) -> Self {
        Self { cleaned,
               errors: FieldErrors::new() }
    }

    pub fn invalid(errors: FieldErrors) -> Self {
        Self { cleaned: StepData::new(),
               errors }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Vista de sólo lectura de la sesión durante la validación de un step.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub session_id: Uuid,
    pub step_index: usize,
    committed: &'a BTreeMap<usize, StepData>,
}

impl<'a> ValidationContext<'a> {
    pub fn new(session_id: Uuid, step_index: usize, committed: &'a BTreeMap<usize, StepData>) -> Self {
        Self { session_id,
               step_index,
               committed }
    }

    pub fn committed(&self, step_index: usize) -> Option<&'a StepData> {
        self.committed.get(&step_index)
    }

    /// Busca `key` en los steps commiteados, del más reciente al más antiguo.
    pub fn lookup(&self, key: &str) -> Option<&'a Value> {
        self.committed.values().rev().find_map(|d| d.get(key))
    }
}
