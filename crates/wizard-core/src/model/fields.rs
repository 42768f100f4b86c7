//! Tipos de datos de campos: valores enviados, streams de archivos, datos
//! limpios y errores por campo.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;

/// Campos escalares enviados (nombre → valor).
pub type FieldMap = BTreeMap<String, String>;

/// Payload binario de un campo de archivo. Se consume una sola vez.
pub type FileStream = Box<dyn Read + Send>;

/// Archivos enviados (nombre → stream).
pub type FileMap = HashMap<String, FileStream>;

/// Datos limpios de un step tras validar. Es lo que se commitea y se firma.
pub type StepData = serde_json::Map<String, Value>;

/// Clave para errores que no pertenecen a un campo concreto.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Errores de validación agrupados por campo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Variante encadenable de `add`.
    pub fn with(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.add(field, message);
        self
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }
}
