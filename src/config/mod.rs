//! Configuration module for Confluence.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Market data, Notifications, and Observability.

mod market_config;
mod notifier_config;
mod observability_config;

pub use market_config::{MAX_HISTORY_LIMIT, MarketEnvConfig};
pub use notifier_config::NotifierEnvConfig;
pub use observability_config::ObservabilityEnvConfig;

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Where candles come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Mock,
    Binance,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Mode::Mock),
            "binance" => Ok(Mode::Binance),
            _ => anyhow::bail!("Invalid MODE: {}. Must be 'mock' or 'binance'", s),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub market: MarketEnvConfig,
    pub notifier: NotifierEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let mode_str = env::var("MODE").unwrap_or_else(|_| "binance".to_string());
        let mode = Mode::from_str(&mode_str)?;

        let market = MarketEnvConfig::from_env().context("Failed to load market config")?;
        let config = Self {
            mode,
            market,
            notifier: NotifierEnvConfig::from_env(),
            observability: ObservabilityEnvConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.market.validate().context("Invalid market config")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Binance,
            market: MarketEnvConfig::default(),
            notifier: NotifierEnvConfig::default(),
            observability: ObservabilityEnvConfig::default(),
        }
    }
}
