//! Prometheus metrics definitions for Confluence
//!
//! All metrics use the `confluence_` prefix and are read-only.

use crate::domain::signal::Classification;
use prometheus::{
    Counter, CounterVec, Gauge, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

/// Prometheus metrics for the signal pipeline
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Evaluation cycles run
    pub cycles_total: Counter,
    /// Classifications by kind
    pub classifications_total: CounterVec,
    /// Notifications by outcome (sent, failed, suppressed)
    pub notifications_total: CounterVec,
    /// Candles accepted into the store by origin (history, live)
    pub candles_ingested_total: CounterVec,
    /// Candles rejected as late, duplicated or malformed
    pub candles_rejected_total: Counter,
    /// Failed REST backfills
    pub backfill_failures_total: Counter,
    /// Live stream reconnection attempts
    pub stream_reconnects_total: Counter,
    /// Close of the latest evaluated candle
    pub last_close: GenericGauge<AtomicF64>,
    /// RSI of the latest evaluated candle
    pub last_rsi: GenericGauge<AtomicF64>,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let cycles_total = Counter::with_opts(Opts::new(
            "confluence_cycles_total",
            "Total evaluation cycles",
        ))?;
        registry.register(Box::new(cycles_total.clone()))?;

        let classifications_total = CounterVec::new(
            Opts::new(
                "confluence_classifications_total",
                "Classifications by kind",
            ),
            &["classification"],
        )?;
        registry.register(Box::new(classifications_total.clone()))?;

        let notifications_total = CounterVec::new(
            Opts::new(
                "confluence_notifications_total",
                "Notifications by side and outcome",
            ),
            &["side", "outcome"],
        )?;
        registry.register(Box::new(notifications_total.clone()))?;

        let candles_ingested_total = CounterVec::new(
            Opts::new(
                "confluence_candles_ingested_total",
                "Candles accepted into the rolling buffer",
            ),
            &["origin"],
        )?;
        registry.register(Box::new(candles_ingested_total.clone()))?;

        let candles_rejected_total = Counter::with_opts(Opts::new(
            "confluence_candles_rejected_total",
            "Candles rejected as late, duplicated or malformed",
        ))?;
        registry.register(Box::new(candles_rejected_total.clone()))?;

        let backfill_failures_total = Counter::with_opts(Opts::new(
            "confluence_backfill_failures_total",
            "Failed REST history fetches",
        ))?;
        registry.register(Box::new(backfill_failures_total.clone()))?;

        let stream_reconnects_total = Counter::with_opts(Opts::new(
            "confluence_stream_reconnects_total",
            "Live kline stream reconnection attempts",
        ))?;
        registry.register(Box::new(stream_reconnects_total.clone()))?;

        let last_close = Gauge::with_opts(Opts::new(
            "confluence_last_close",
            "Close of the latest evaluated candle",
        ))?;
        registry.register(Box::new(last_close.clone()))?;

        let last_rsi = Gauge::with_opts(Opts::new(
            "confluence_last_rsi",
            "RSI(14) of the latest evaluated candle",
        ))?;
        registry.register(Box::new(last_rsi.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            cycles_total,
            classifications_total,
            notifications_total,
            candles_ingested_total,
            candles_rejected_total,
            backfill_failures_total,
            stream_reconnects_total,
            last_close,
            last_rsi,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn record_classification(&self, classification: Classification) {
        self.cycles_total.inc();
        self.classifications_total
            .with_label_values(&[classification.as_str()])
            .inc();
    }

    pub fn record_notification(&self, side: &str, outcome: &str) {
        self.notifications_total
            .with_label_values(&[side, outcome])
            .inc();
    }

    pub fn record_ingested(&self, origin: &str, count: usize) {
        self.candles_ingested_total
            .with_label_values(&[origin])
            .inc_by(count as f64);
    }

    pub fn notification_count(&self, side: &str, outcome: &str) -> f64 {
        self.notifications_total
            .with_label_values(&[side, outcome])
            .get()
    }
}
