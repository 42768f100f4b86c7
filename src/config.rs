//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) una sola vez y las convierte en un
//! `AppConfig` inmutable. Los valores inválidos son errores de configuración,
//! no se sustituyen en silencio por el valor por defecto.
use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;

use wizard_integrity::{LockPolicy, PipelineConfig, DEFAULT_CHUNK_SIZE, DEFAULT_STAGING_ROOT};
use wizard_steps::FormatCheck;

use crate::errors::CoreError;

pub const ENV_STAGING_DIR: &str = "WIZARD_STAGING_DIR";
pub const ENV_CHUNK_SIZE: &str = "WIZARD_CHUNK_SIZE";
pub const ENV_LOCK_POLICY: &str = "WIZARD_LOCK_POLICY";
pub const ENV_TOKEN_SECRET: &str = "WIZARD_TOKEN_SECRET";
pub const ENV_FIELD_PREFIX: &str = "WIZARD_FIELD_PREFIX";
pub const ENV_FORMAT_CHECK: &str = "WIZARD_FORMAT_CHECK";

/// `.env` se lee como mucho una vez por proceso.
static DOTENV: Lazy<bool> = Lazy::new(|| dotenvy::dotenv().is_ok());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Área de staging por defecto (cuando el wizard no elige punto de montaje).
    pub staging_dir: PathBuf,
    pub chunk_size: usize,
    pub lock_policy: LockPolicy,
    /// Secreto de los tokens de integridad. Sin él, la clave es aleatoria por
    /// proceso y las sesiones no sobreviven a un reinicio.
    pub token_secret: Option<String>,
    pub field_prefix: String,
    /// Quién valida el formato del contenedor subido.
    pub format_check: FormatCheck,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { staging_dir: PathBuf::from(DEFAULT_STAGING_ROOT),
               chunk_size: DEFAULT_CHUNK_SIZE,
               lock_policy: LockPolicy::Reject,
               token_secret: None,
               field_prefix: String::new(),
               format_check: FormatCheck::Builtin }
    }
}

impl AppConfig {
    /// Lee la configuración del entorno del proceso (y `.env`, si existe).
    pub fn from_env() -> Result<Self, CoreError> {
        if *DOTENV {
            log::debug!(".env loaded");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero con una fuente de variables arbitraria.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
        where F: Fn(&str) -> Option<String>
    {
        let mut cfg = Self::default();
        if let Some(dir) = lookup(ENV_STAGING_DIR).filter(|v| !v.trim().is_empty()) {
            cfg.staging_dir = PathBuf::from(dir.trim());
        }
        if let Some(raw) = lookup(ENV_CHUNK_SIZE) {
            cfg.chunk_size = match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(CoreError::Config(format!("{ENV_CHUNK_SIZE} debe ser un entero > 0, recibido '{raw}'"))),
            };
        }
        if let Some(raw) = lookup(ENV_LOCK_POLICY) {
            cfg.lock_policy = raw.parse().map_err(|e| CoreError::Config(format!("{ENV_LOCK_POLICY}: {e}")))?;
        }
        cfg.token_secret = lookup(ENV_TOKEN_SECRET).filter(|v| !v.is_empty());
        if let Some(prefix) = lookup(ENV_FIELD_PREFIX) {
            cfg.field_prefix = prefix;
        }
        if let Some(raw) = lookup(ENV_FORMAT_CHECK) {
            cfg.format_check = raw.parse().map_err(|e| CoreError::Config(format!("{ENV_FORMAT_CHECK}: {e}")))?;
        }
        Ok(cfg)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig { staging_root: self.staging_dir.clone(),
                         chunk_size: self.chunk_size,
                         lock_policy: self.lock_policy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.staging_dir, PathBuf::from("/var/tmp/firmware"));
        assert_eq!(cfg.chunk_size, 65536);
    }

    #[test]
    fn reads_every_variable() {
        let cfg = AppConfig::from_lookup(lookup(&[(ENV_STAGING_DIR, "/mnt/tank/.staging"),
                                                  (ENV_CHUNK_SIZE, "4096"),
                                                  (ENV_LOCK_POLICY, "block"),
                                                  (ENV_TOKEN_SECRET, "s3cret"),
                                                  (ENV_FIELD_PREFIX, "fw"),
                                                  (ENV_FORMAT_CHECK, "Executor")])).unwrap();
        assert_eq!(cfg.pipeline_config(),
                   PipelineConfig { staging_root: PathBuf::from("/mnt/tank/.staging"),
                                    chunk_size: 4096,
                                    lock_policy: LockPolicy::Block });
        assert_eq!(cfg.token_secret.as_deref(), Some("s3cret"));
        assert_eq!(cfg.field_prefix, "fw");
        assert_eq!(cfg.format_check, FormatCheck::Executor);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for (k, v) in [(ENV_CHUNK_SIZE, "0"), (ENV_CHUNK_SIZE, "big"), (ENV_LOCK_POLICY, "queue"), (ENV_FORMAT_CHECK, "magic")] {
            let err = AppConfig::from_lookup(lookup(&[(k, v)])).unwrap_err();
            assert!(matches!(err, CoreError::Config(_)), "{k}={v}");
        }
    }
}
