//! Push-based metrics reporter for Confluence
//!
//! Periodically logs the metrics registry as one structured JSON line.
//!
//! **Security**: This system only SENDS data, never accepts requests.

use crate::domain::ports::ShutdownSignal;
use crate::domain::signal::SignalSide;
use crate::infrastructure::observability::metrics::Metrics;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Metrics snapshot for JSON output
#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub symbol: String,
    pub market: MarketSnapshot,
    pub pipeline: PipelineSnapshot,
}

#[derive(Debug, Serialize)]
pub struct MarketSnapshot {
    pub last_close: f64,
    pub last_rsi: f64,
    pub candles_ingested: f64,
    pub candles_rejected: f64,
    pub backfill_failures: f64,
    pub stream_reconnects: f64,
}

#[derive(Debug, Serialize)]
pub struct PipelineSnapshot {
    pub cycles: f64,
    pub strong_buy: f64,
    pub strong_sell: f64,
    pub notifications_sent: f64,
    pub notifications_failed: f64,
}

/// Push-based metrics reporter
///
/// Outputs metrics as structured JSON logs on a configurable interval.
/// No HTTP server, no incoming connections - only outbound data.
pub struct MetricsReporter {
    symbol: String,
    metrics: Metrics,
    start_time: Instant,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(symbol: impl Into<String>, metrics: Metrics, interval_seconds: u64) -> Self {
        Self {
            symbol: symbol.into(),
            metrics,
            start_time: Instant::now(),
            interval: Duration::from_secs(interval_seconds.max(1)),
        }
    }

    /// Report until `shutdown` fires
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        info!(
            "MetricsReporter: Starting push-based metrics (interval: {:?})",
            self.interval
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }

            let snapshot = self.collect_snapshot();
            match serde_json::to_string(&snapshot) {
                Ok(json) => {
                    // Fixed prefix so log shippers can filter these lines
                    info!("METRICS_JSON:{}", json);
                    info!(
                        "{}: close {:.2} | RSI {:.1} | cycles {} | alerts sent {}",
                        snapshot.symbol,
                        snapshot.market.last_close,
                        snapshot.market.last_rsi,
                        snapshot.pipeline.cycles,
                        snapshot.pipeline.notifications_sent
                    );
                }
                Err(e) => warn!("MetricsReporter: Failed to serialize metrics: {}", e),
            }
        }

        info!("MetricsReporter: Stopped");
    }

    pub fn collect_snapshot(&self) -> MetricsSnapshot {
        let m = &self.metrics;
        let ingested = ["history", "live"]
            .iter()
            .map(|origin| m.candles_ingested_total.with_label_values(&[*origin]).get())
            .sum::<f64>();
        let notifications = |outcome: &str| -> f64 {
            [SignalSide::Buy, SignalSide::Sell]
                .iter()
                .map(|side| m.notification_count(side.as_str(), outcome))
                .sum()
        };

        MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            symbol: self.symbol.clone(),
            market: MarketSnapshot {
                last_close: m.last_close.get(),
                last_rsi: m.last_rsi.get(),
                candles_ingested: ingested,
                candles_rejected: m.candles_rejected_total.get(),
                backfill_failures: m.backfill_failures_total.get(),
                stream_reconnects: m.stream_reconnects_total.get(),
            },
            pipeline: PipelineSnapshot {
                cycles: m.cycles_total.get(),
                strong_buy: m.classifications_total.with_label_values(&["strong_buy"]).get(),
                strong_sell: m.classifications_total.with_label_values(&["strong_sell"]).get(),
                notifications_sent: notifications("sent"),
                notifications_failed: notifications("failed"),
            },
        }
    }
}
