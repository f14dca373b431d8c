//! Observability configuration parsing from environment variables.
//!
//! This module handles loading metrics reporting configuration.

use std::env;

/// Observability environment configuration
#[derive(Debug, Clone)]
pub struct ObservabilityEnvConfig {
    pub enabled: bool,
    /// Seconds between two metrics reports
    pub interval_secs: u64,
}

impl Default for ObservabilityEnvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
        }
    }
}

impl ObservabilityEnvConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            enabled: var("OBSERVABILITY_ENABLED")
                .and_then(|v| v.parse::<bool>().ok())
                .unwrap_or(true),
            interval_secs: var("OBSERVABILITY_INTERVAL")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60),
        }
    }
}
