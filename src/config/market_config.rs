//! Market data configuration parsing from environment variables.

use crate::domain::market::KlineInterval;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Upper bound of the klines REST endpoint
pub const MAX_HISTORY_LIMIT: usize = 1000;

/// Market data environment configuration
#[derive(Debug, Clone)]
pub struct MarketEnvConfig {
    pub symbol: String,
    pub interval: KlineInterval,
    /// Candles requested per backfill; also the rolling buffer capacity
    pub history_limit: usize,
    pub refresh_interval_secs: u64,
    pub binance_base_url: String,
    pub binance_ws_url: String,
    pub stream_max_backoff_secs: u64,
}

impl Default for MarketEnvConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            interval: KlineInterval::OneMin,
            history_limit: 500,
            refresh_interval_secs: 15,
            binance_base_url: "https://api.binance.com".to_string(),
            binance_ws_url: "wss://stream.binance.com:9443".to_string(),
            stream_max_backoff_secs: 60,
        }
    }
}

impl MarketEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let interval = match var("KLINE_INTERVAL") {
            Some(raw) => KlineInterval::from_str(&raw)?,
            None => defaults.interval,
        };

        Ok(Self {
            symbol: var("SYMBOL")
                .map(|s| s.trim().to_uppercase())
                .unwrap_or(defaults.symbol),
            interval,
            history_limit: parse_or(&var, "HISTORY_LIMIT", defaults.history_limit)?,
            refresh_interval_secs: parse_or(
                &var,
                "REFRESH_INTERVAL_SECS",
                defaults.refresh_interval_secs,
            )?,
            binance_base_url: var("BINANCE_BASE_URL").unwrap_or(defaults.binance_base_url),
            binance_ws_url: var("BINANCE_WS_URL").unwrap_or(defaults.binance_ws_url),
            stream_max_backoff_secs: parse_or(
                &var,
                "STREAM_MAX_BACKOFF_SECS",
                defaults.stream_max_backoff_secs,
            )?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            anyhow::bail!("SYMBOL must not be empty");
        }
        // One slot of every backfill is the provisional candle
        if !(2..=MAX_HISTORY_LIMIT).contains(&self.history_limit) {
            anyhow::bail!(
                "Invalid HISTORY_LIMIT: {}. Must be between 2 and {}",
                self.history_limit,
                MAX_HISTORY_LIMIT
            );
        }
        if self.refresh_interval_secs == 0 {
            anyhow::bail!("REFRESH_INTERVAL_SECS must be greater than 0");
        }
        if self.stream_max_backoff_secs == 0 {
            anyhow::bail!("STREAM_MAX_BACKOFF_SECS must be greater than 0");
        }
        Ok(())
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid {}: {}", key, raw)),
        None => Ok(default),
    }
}
