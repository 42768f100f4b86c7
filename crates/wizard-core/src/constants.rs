//! Constantes del motor de wizard.
//!
//! Algunos de estos valores forman parte del input de los tokens de
//! integridad; cambiarlos invalida cualquier sesión en curso.

/// Versión lógica del motor. Entra en el hash de la definición y en cada
/// token de integridad, de modo que un cambio incompatible del motor invalida
/// sesiones emitidas por la versión anterior.
pub const ENGINE_VERSION: &str = "W1.0";

/// Campo de la petición que indica qué step se está enviando.
pub const STEP_MARKER_FIELD: &str = "wizard_step";

/// Contexto de derivación de la clave de tokens (blake3 `derive_key`).
pub const TOKEN_KEY_CONTEXT: &str = "sysupdate-wizard 2024 step integrity token v1";

/// Mensaje estándar para campos obligatorios ausentes.
pub const REQUIRED_FIELD_MESSAGE: &str = "This field is required.";
