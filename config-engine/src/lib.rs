//! Layered configuration loading for Relay Console
//!
//! Sources, lowest to highest priority:
//!
//! 1. Built-in defaults ([`Settings::default`])
//! 2. A YAML file (by default `relay-console.yaml`, skipped when absent)
//! 3. Environment variables with the `RELAY_` prefix, `__` separating
//!    nested keys: `RELAY_SERVER__PORT=9000` sets `server.port`
//!
//! `.env` files are honoured through [`ConfigEngine::load_with_dotenv`].
//! Loaded settings are validated before they are returned.
//!
//! # Example
//!
//! ```rust,no_run
//! use config_engine::ConfigEngine;
//!
//! let settings = ConfigEngine::new()
//!     .with_file("relay-console.yaml")
//!     .load_with_dotenv()
//!     .expect("valid configuration");
//!
//! println!("listening on {}", settings.server.bind_address());
//! ```

pub mod error;
pub mod settings;
pub mod validation;

pub use error::*;
pub use settings::*;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_FILE: &str = "relay-console.yaml";
pub const DEFAULT_ENV_PREFIX: &str = "RELAY_";

/// Builder for the configuration provider chain
#[derive(Debug, Clone)]
pub struct ConfigEngine {
    file: PathBuf,
    env_prefix: String,
}

impl Default for ConfigEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigEngine {
    pub fn new() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_CONFIG_FILE),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = path.into();
        self
    }

    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// The provider chain, exposed so callers can merge overrides on top
    pub fn figment(&self) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        if self.file.exists() {
            tracing::debug!(path = %self.file.display(), "Merging configuration file");
            figment = figment.merge(Yaml::file(&self.file));
        } else {
            tracing::debug!(path = %self.file.display(), "Configuration file not found, using defaults");
        }

        figment.merge(Env::prefixed(&self.env_prefix).split("__"))
    }

    /// Extract and validate settings
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when a source fails to parse and
    /// [`ConfigError::Validation`] when the merged settings are inconsistent.
    pub fn load(&self) -> Result<Settings> {
        Self::extract(&self.figment())
    }

    /// Load `.env` from the working directory first, then [`load`](Self::load)
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn load_with_dotenv(&self) -> Result<Settings> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
        }
        self.load()
    }

    /// Extract and validate settings from an arbitrary figment
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn extract(figment: &Figment) -> Result<Settings> {
        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }
}
