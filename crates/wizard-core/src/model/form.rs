//! Descriptor de formulario de un step, para que un renderer externo pueda
//! dibujarlo. El motor no renderiza nada.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Choice { choices: Vec<String> },
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub help_text: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(),
               label: label.into(),
               kind,
               required: true,
               help_text: None }
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help_text = Some(text.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepForm {
    pub step_id: String,
    pub fields: Vec<FieldSpec>,
}

impl StepForm {
    pub fn new(step_id: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self { step_id: step_id.into(),
               fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Indica si el formulario lleva al menos un campo de archivo.
    pub fn is_multipart(&self) -> bool {
        self.fields.iter().any(|f| matches!(f.kind, FieldKind::File))
    }
}
