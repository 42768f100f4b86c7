//! sysupdate-wizard
//!
//! Librería de aplicación sobre los crates del workspace:
//! - `config`: lectura de variables de entorno (.env) a un `AppConfig`.
//! - `errors`: error de la capa de aplicación.
//! - `app`: ensamblado de pipeline, firmador y wizards estándar.
//!
//! La lógica vive en `wizard-core` (motor y tokens), `wizard-integrity`
//! (staging y verificación) y `wizard-steps` (steps concretos).

pub mod app;
pub mod config;
pub mod errors;

pub use app::Appliance;
pub use config::AppConfig;
pub use errors::CoreError;
