use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{DatabaseSettings, LoggingSettings, ServerSettings, Settings};

/// The optional file consulted on top of the built-in defaults.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Loads the application settings for this process.
///
/// A `.env` file is loaded into the environment first if one exists. Values are
/// then layered: built-in defaults, the optional `config.toml`, `FRED__*`
/// variables, and finally the plain `PORT`, `DATABASE_URL` and `CORS_ORIGIN`
/// variables.
pub fn load_config() -> Result<Settings, ConfigError> {
    // A missing .env is normal in production.
    dotenvy::dotenv().ok();
    let env: HashMap<String, String> = std::env::vars().collect();
    Settings::load(Path::new(DEFAULT_CONFIG_FILE), env)
}
