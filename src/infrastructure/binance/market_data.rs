//! Binance candle source
//!
//! - Historical klines over REST (`/api/v3/klines`)
//! - Closed klines from the public WebSocket stream

use super::websocket::BinanceKlineStream;
use crate::domain::errors::MarketDataError;
use crate::domain::market::{Candle, KlineInterval};
use crate::domain::ports::{CandleSource, ShutdownSignal};
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use crate::infrastructure::observability::Metrics;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use tokio::sync::mpsc::Receiver;
use tracing::{info, warn};

/// Hard cap of the klines endpoint
pub const MAX_KLINES_LIMIT: usize = 1000;

pub struct BinanceCandleSource {
    client: ClientWithMiddleware,
    base_url: String,
    stream: BinanceKlineStream,
}

impl BinanceCandleSource {
    pub fn builder() -> BinanceCandleSourceBuilder {
        BinanceCandleSourceBuilder::default()
    }
}

#[derive(Default)]
pub struct BinanceCandleSourceBuilder {
    base_url: Option<String>,
    ws_url: Option<String>,
    max_backoff_secs: Option<u64>,
    metrics: Option<Metrics>,
}

impl BinanceCandleSourceBuilder {
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn ws_url(mut self, ws_url: String) -> Self {
        self.ws_url = Some(ws_url);
        self
    }

    pub fn max_backoff_secs(mut self, secs: u64) -> Self {
        self.max_backoff_secs = Some(secs);
        self
    }

    pub fn metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<BinanceCandleSource> {
        let base_url = self.base_url.context("base_url is required")?;
        let ws_url = self.ws_url.context("ws_url is required")?;

        let mut stream = BinanceKlineStream::new(ws_url);
        if let Some(secs) = self.max_backoff_secs {
            stream = stream.with_max_backoff_secs(secs);
        }
        if let Some(metrics) = self.metrics {
            stream = stream.with_metrics(metrics);
        }

        Ok(BinanceCandleSource {
            client: HttpClientFactory::create_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            stream,
        })
    }
}

#[async_trait]
impl CandleSource for BinanceCandleSource {
    async fn fetch_history(
        &self,
        symbol: &str,
        interval: KlineInterval,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let limit = limit.clamp(1, MAX_KLINES_LIMIT).to_string();
        let url = format!("{}/api/v3/klines", self.base_url);
        let url_with_query = build_url_with_query(
            &url,
            &[
                ("symbol", symbol),
                ("interval", interval.as_str()),
                ("limit", limit.as_str()),
            ],
        );

        let response = self
            .client
            .get(&url_with_query)
            .send()
            .await
            .context("Failed to fetch klines from Binance")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(MarketDataError::FetchFailed {
                symbol: symbol.to_string(),
                reason: format!("HTTP {}: {}", status, error_text),
            }
            .into());
        }

        let klines: Vec<serde_json::Value> = response
            .json()
            .await
            .context("Failed to parse Binance klines response")?;

        let candles = parse_rest_klines(symbol, &klines);
        info!(
            "BinanceCandleSource: Fetched {} {} candles for {}",
            candles.len(),
            interval,
            symbol
        );

        Ok(candles)
    }

    async fn subscribe_closed_candles(
        &self,
        symbol: &str,
        interval: KlineInterval,
        shutdown: ShutdownSignal,
    ) -> Result<Receiver<Candle>> {
        self.stream.subscribe(symbol, interval, shutdown)
    }
}

/// Convert kline arrays `[openTime, "open", "high", "low", "close", "volume", ...]`
/// into candles, skipping rows that do not parse.
pub fn parse_rest_klines(symbol: &str, klines: &[serde_json::Value]) -> Vec<Candle> {
    let candles: Vec<Candle> = klines.iter().filter_map(parse_kline_row).collect();

    let skipped = klines.len() - candles.len();
    if skipped > 0 {
        warn!(
            "BinanceCandleSource: Skipped {} malformed kline rows for {}",
            skipped, symbol
        );
    }
    candles
}

fn parse_kline_row(row: &serde_json::Value) -> Option<Candle> {
    let arr = row.as_array()?;
    if arr.len() < 6 {
        return None;
    }

    let price = |i: usize| arr[i].as_str()?.parse::<f64>().ok();

    Some(Candle::new(
        arr[0].as_i64()?,
        price(1)?,
        price(2)?,
        price(3)?,
        price(4)?,
        price(5)?,
    ))
}
