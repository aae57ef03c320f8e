//! Coordinator configuration

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Upper bound on entries rendered by `Coordinator::summary`
pub const MAX_SUMMARY_ENTRIES: usize = 5;

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// How many injected findings the context log retains (oldest evicted first)
    #[serde(rename = "context-log-capacity", default = "default_context_log_capacity")]
    pub context_log_capacity: usize,

    /// How many recent context entries the summary renders (capped at 5)
    #[serde(rename = "summary-entries", default = "default_summary_entries")]
    pub summary_entries: usize,
}

fn default_context_log_capacity() -> usize {
    debug!("default_context_log_capacity: called");
    100
}

fn default_summary_entries() -> usize {
    debug!("default_summary_entries: called");
    MAX_SUMMARY_ENTRIES
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        debug!("CoordinatorConfig::default: called");
        Self {
            context_log_capacity: 100,
            summary_entries: MAX_SUMMARY_ENTRIES,
        }
    }
}

impl CoordinatorConfig {
    /// Summary entry count after applying the cap
    pub fn effective_summary_entries(&self) -> usize {
        debug!(summary_entries = self.summary_entries, "CoordinatorConfig::effective_summary_entries: called");
        self.summary_entries.min(MAX_SUMMARY_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.context_log_capacity, 100);
        assert_eq!(config.summary_entries, 5);
    }

    #[test]
    fn test_summary_entries_capped() {
        let config = CoordinatorConfig {
            summary_entries: 50,
            ..Default::default()
        };
        assert_eq!(config.effective_summary_entries(), MAX_SUMMARY_ENTRIES);

        let config = CoordinatorConfig {
            summary_entries: 2,
            ..Default::default()
        };
        assert_eq!(config.effective_summary_entries(), 2);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: CoordinatorConfig = serde_yaml::from_str("context-log-capacity: 10\n").unwrap();
        assert_eq!(config.context_log_capacity, 10);
        assert_eq!(config.summary_entries, 5);
    }
}
