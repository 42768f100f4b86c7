//! Tokens de integridad por step.
//!
//! Un token es el hash blake3 *con clave* de la forma canónica de
//! `TokenInput`. Sin la clave no se puede forjar un token válido para datos
//! alterados; como cada token incluye el del step anterior, tampoco se puede
//! reordenar o trasplantar steps entre sesiones.

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use uuid::Uuid;

use super::to_canonical_json;
use crate::constants::{ENGINE_VERSION, TOKEN_KEY_CONTEXT};
use crate::model::StepData;

/// Insumos de un token. No es el token, sino el modelo previo a canonicalizar.
#[derive(Debug, Serialize)]
pub struct TokenInput<'a> {
    pub session_id: Uuid,
    pub definition_hash: &'a str,
    pub step_index: usize,
    pub step_id: &'a str,
    pub data: &'a StepData,
    /// Token del step anterior ("" para el step 0).
    pub previous: &'a str,
}

impl TokenInput<'_> {
    fn canonical(&self) -> String {
        let v = json!({
            "engine_version": ENGINE_VERSION,
            "session_id": self.session_id.to_string(),
            "definition_hash": self.definition_hash,
            "step_index": self.step_index,
            "step_id": self.step_id,
            "data": Value::Object(self.data.clone()),
            "previous": self.previous,
        });
        to_canonical_json(&v)
    }
}

/// Firma y verifica tokens con una clave de 32 bytes.
#[derive(Clone)]
pub struct TokenSigner {
    key: [u8; 32],
}

impl TokenSigner {
    pub fn from_key(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Deriva la clave a partir de un secreto arbitrario (configuración).
    pub fn from_secret(secret: &str) -> Self {
        Self { key: blake3::derive_key(TOKEN_KEY_CONTEXT, secret.as_bytes()) }
    }

    /// Clave aleatoria válida sólo durante la vida del proceso.
    pub fn ephemeral() -> Self {
        Self { key: rand::random() }
    }

    pub fn sign(&self, input: &TokenInput<'_>) -> String {
        blake3::keyed_hash(&self.key, input.canonical().as_bytes()).to_hex().to_string()
    }

    /// Comparación en tiempo constante (`blake3::Hash::eq`). Un token que no
    /// es hex válido simplemente no verifica.
    pub fn verify(&self, input: &TokenInput<'_>, token: &str) -> bool {
        let expected = blake3::keyed_hash(&self.key, input.canonical().as_bytes());
        match blake3::Hash::from_hex(token.trim()) {
            Ok(provided) => provided == expected,
            Err(_) => false,
        }
    }
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner").field("key", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(v: &str) -> StepData {
        let mut d = StepData::new();
        d.insert("mountpoint".into(), json!(v));
        d
    }

    #[test]
    fn sign_then_verify_and_detect_changes() {
        let signer = TokenSigner::from_secret("s3cret");
        let sid = Uuid::new_v4();
        let d = data("/mnt/tank");
        let input = TokenInput { session_id: sid,
                                 definition_hash: "def",
                                 step_index: 0,
                                 step_id: "location",
                                 data: &d,
                                 previous: "" };
        let token = signer.sign(&input);
        assert_eq!(token.len(), 64);
        assert!(signer.verify(&input, &token));
        assert!(signer.verify(&input, &token.to_uppercase()));

        let forged = data("/mnt/evil");
        let tampered = TokenInput { data: &forged, ..input };
        assert!(!signer.verify(&tampered, &token));

        let other_key = TokenSigner::from_secret("other");
        assert!(!other_key.verify(&input, &token));
        assert!(!signer.verify(&input, "not-hex"));
    }

    #[test]
    fn debug_hides_key() {
        let s = format!("{:?}", TokenSigner::ephemeral());
        assert!(s.contains("redacted"));
    }
}
