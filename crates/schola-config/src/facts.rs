//! Fact publication configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FactsConfig {
    /// Directory for per-day JSONL fact files. Empty disables the sink.
    #[serde(default)]
    pub jsonl_dir: String,

    /// Maximum facts drained per relay pass.
    #[serde(default = "default_batch_size")]
    pub relay_batch_size: usize,
}

const fn default_batch_size() -> usize {
    100
}

impl Default for FactsConfig {
    fn default() -> Self {
        Self {
            jsonl_dir: String::new(),
            relay_batch_size: default_batch_size(),
        }
    }
}

impl FactsConfig {
    #[must_use]
    pub fn jsonl_path(&self) -> Option<PathBuf> {
        let dir = self.jsonl_dir.trim();
        (!dir.is_empty()).then(|| PathBuf::from(dir))
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        if self.relay_batch_size == 0 {
            default_batch_size()
        } else {
            self.relay_batch_size
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_disabled_by_default() {
        let config = FactsConfig::default();
        assert!(config.jsonl_path().is_none());
        assert_eq!(config.batch_size(), 100);
    }
}
