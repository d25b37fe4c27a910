//! Subject lookup cache configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ConfigError;

const fn default_subject_ttl_secs() -> u64 {
    300
}

const fn default_listing_ttl_secs() -> u64 {
    60
}

const fn default_lookup_timeout_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Lifetime of a cached subject projection.
    #[serde(default = "default_subject_ttl_secs")]
    pub subject_ttl_secs: u64,

    /// Lifetime of a cached "active subjects of a school" listing.
    #[serde(default = "default_listing_ttl_secs")]
    pub listing_ttl_secs: u64,

    /// Upper bound on a single catalog call.
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            subject_ttl_secs: default_subject_ttl_secs(),
            listing_ttl_secs: default_listing_ttl_secs(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
        }
    }
}

impl CatalogConfig {
    #[must_use]
    pub const fn subject_ttl(&self) -> Duration {
        Duration::from_secs(self.subject_ttl_secs)
    }

    #[must_use]
    pub const fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_secs)
    }

    #[must_use]
    pub const fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.subject_ttl_secs == 0 {
            return Err(ConfigError::invalid("catalog.subject_ttl_secs", "must be > 0"));
        }
        if self.listing_ttl_secs == 0 {
            return Err(ConfigError::invalid("catalog.listing_ttl_secs", "must be > 0"));
        }
        if self.lookup_timeout_ms == 0 {
            return Err(ConfigError::invalid("catalog.lookup_timeout_ms", "must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = CatalogConfig::default();
        assert_eq!(config.subject_ttl(), Duration::from_secs(300));
        assert_eq!(config.listing_ttl(), Duration::from_secs(60));
        assert_eq!(config.lookup_timeout(), Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_ttl_rejected() {
        let config = CatalogConfig {
            subject_ttl_secs: 0,
            ..CatalogConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
