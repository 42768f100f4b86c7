//! Petición de envío de un step: campos escalares (incluido el marcador de
//! step) y archivos como streams.

use std::fmt;
use std::io::Read;

use super::{FieldMap, FileMap, FileStream};
use crate::constants::STEP_MARKER_FIELD;

#[derive(Default)]
pub struct WizardRequest {
    pub fields: FieldMap,
    pub files: FileMap,
}

impl WizardRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Petición con el marcador de step ya fijado.
    pub fn for_step(step_index: usize) -> Self {
        Self::new().with_field(STEP_MARKER_FIELD, step_index.to_string())
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_file<R>(mut self, name: impl Into<String>, stream: R) -> Self
        where R: Read + Send + 'static
    {
        self.files.insert(name.into(), Box::new(stream) as FileStream);
        self
    }

    pub fn step_marker(&self) -> Option<&str> {
        self.fields.get(STEP_MARKER_FIELD).map(String::as_str)
    }
}

impl fmt::Debug for WizardRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut files: Vec<&String> = self.files.keys().collect();
        files.sort();
        f.debug_struct("WizardRequest")
         .field("fields", &self.fields)
         .field("files", &files)
         .finish()
    }
}
