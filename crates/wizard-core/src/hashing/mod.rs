//! Módulo de hashing, canonicalización JSON y tokens de integridad.

pub mod canonical_json;
pub mod hash;
pub mod token;

pub use canonical_json::to_canonical_json;
pub use hash::{hash_str, hash_value};
pub use token::{TokenInput, TokenSigner};
