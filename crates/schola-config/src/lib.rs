//! # schola-config
//!
//! Layered configuration loading for Schola using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`SCHOLA_*` prefix, `__` as separator)
//! 2. Project-level `.schola/config.toml`
//! 3. User-level `~/.config/schola/config.toml`
//! 4. Built-in defaults
//!
//! Figment maps `SCHOLA_DATABASE__PATH` -> `database.path`,
//! `SCHOLA_POLICY__SHIFTS__MORNING` -> `policy.shifts.morning`, etc.
//!
//! ```no_run
//! use schola_config::ScholaConfig;
//!
//! let config = ScholaConfig::load_with_dotenv().expect("config");
//! let policy = config.policy.to_policy().expect("policy");
//! println!("slots of {}..={} min", policy.slot.min_minutes, policy.slot.max_minutes);
//! ```

mod catalog;
mod database;
mod error;
mod facts;
mod policy;
mod retry;

pub use catalog::CatalogConfig;
pub use database::{DatabaseConfig, MEMORY_PATH};
pub use error::ConfigError;
pub use facts::FactsConfig;
pub use policy::{PolicyConfig, ShiftConfig};
pub use retry::RetryConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScholaConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub facts: FactsConfig,
}

impl ScholaConfig {
    /// Load configuration from TOML files and environment variables, then
    /// validate it.
    ///
    /// Does NOT call `dotenvy`; use [`ScholaConfig::load_with_dotenv`] for
    /// `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` on extraction failure and
    /// `ConfigError::InvalidValue` if validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`ScholaConfig::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        // A missing .env is the normal case.
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment or layer providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(".schola/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("SCHOLA_").split("__"))
    }

    /// Cross-field validation that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.policy.to_policy()?;
        self.catalog.validate()?;
        self.retry.validate()?;
        Ok(())
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("schola").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ScholaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.path, ".schola/schola.db");
        assert!(config.facts.jsonl_path().is_none());
    }

    #[test]
    fn figment_builds_without_files() {
        figment::Jail::expect_with(|_jail| {
            let config: ScholaConfig = ScholaConfig::figment().extract()?;
            assert_eq!(config.catalog.subject_ttl_secs, 300);
            assert_eq!(config.retry.max_attempts, 4);
            Ok(())
        });
    }
}
