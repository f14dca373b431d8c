use crate::domain::errors::MarketDataError;
use crate::domain::market::{Candle, KlineInterval};
use crate::domain::ports::{CandleSource, ShutdownSignal};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};

/// Open time of the first candle in the canned scenarios
pub const SCENARIO_START_MS: i64 = 1_700_000_000_000;

/// 500 closed candles whose last one meets every buy condition.
///
/// A long rally ends in a crash onto a flat base; the final candle closes
/// above the two previous highs on five times the usual volume while its low
/// dips under the base's supports.
pub fn buy_confluence_series(start_ms: i64, step_ms: i64) -> Vec<Candle> {
    const LEN: usize = 500;
    const BASE: usize = 70;
    let rally = LEN - 2 - BASE;
    let at = |i: usize| start_ms + i as i64 * step_ms;

    let mut candles = Vec::with_capacity(LEN);
    for i in 0..rally {
        let close = 100.0 + 20.0 * i as f64 / (rally - 1) as f64;
        let open = close - 0.02;
        candles.push(Candle::new(at(i), open, close + 0.05, open - 0.05, close, 1000.0));
    }
    candles.push(Candle::new(at(rally), 120.0, 120.0, 99.99, 100.0, 1000.0));
    for i in rally + 1..LEN - 1 {
        candles.push(Candle::new(at(i), 100.0, 100.01, 99.99, 100.0, 1000.0));
    }
    // Higher high right before the breakout
    candles[LEN - 2].high = 100.02;
    candles.push(Candle::new(at(LEN - 1), 100.0, 100.05, 99.8, 100.03, 5000.0));
    candles
}

/// Mirror image of [`buy_confluence_series`] around 100, meeting every sell condition
pub fn sell_confluence_series(start_ms: i64, step_ms: i64) -> Vec<Candle> {
    buy_confluence_series(start_ms, step_ms)
        .into_iter()
        .map(|c| {
            Candle::new(
                c.open_time,
                200.0 - c.open,
                200.0 - c.low,
                200.0 - c.high,
                200.0 - c.close,
                c.volume,
            )
        })
        .collect()
}

/// Deterministic candle source replaying fixed history and live candles.
///
/// `history` is served the way the exchange serves it: ascending, with the
/// newest element being the interval still in progress.
#[derive(Clone)]
pub struct MockCandleSource {
    history: Arc<RwLock<Vec<Candle>>>,
    live: Arc<Vec<Candle>>,
    live_delay: Duration,
    fail_history: Arc<AtomicBool>,
    history_calls: Arc<AtomicUsize>,
}

impl MockCandleSource {
    pub fn new(history: Vec<Candle>, live: Vec<Candle>) -> Self {
        Self {
            history: Arc::new(RwLock::new(history)),
            live: Arc::new(live),
            live_delay: Duration::from_millis(10),
            fail_history: Arc::new(AtomicBool::new(false)),
            history_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Split closed `series` into REST history and `live_count` live candles.
    ///
    /// The history ends with a provisional copy of the first live interval,
    /// which the store is expected to drop.
    pub fn from_series(series: Vec<Candle>, live_count: usize) -> Self {
        let split = series.len().saturating_sub(live_count);
        let (closed, live) = series.split_at(split);

        let mut history = closed.to_vec();
        if let Some(first_live) = live.first() {
            let o = first_live.open;
            history.push(Candle::new(first_live.open_time, o, o, o, o, 0.0));
        }
        Self::new(history, live.to_vec())
    }

    /// History and live feed ending in a strong buy
    pub fn buy_scenario(interval: KlineInterval) -> Self {
        Self::from_series(buy_confluence_series(SCENARIO_START_MS, interval.to_millis()), 1)
    }

    /// History and live feed ending in a strong sell
    pub fn sell_scenario(interval: KlineInterval) -> Self {
        Self::from_series(sell_confluence_series(SCENARIO_START_MS, interval.to_millis()), 1)
    }

    pub fn with_live_delay(mut self, delay: Duration) -> Self {
        self.live_delay = delay;
        self
    }

    pub async fn set_history(&self, history: Vec<Candle>) {
        *self.history.write().await = history;
    }

    /// Make subsequent `fetch_history` calls fail
    pub fn set_history_failing(&self, failing: bool) {
        self.fail_history.store(failing, Ordering::SeqCst);
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandleSource for MockCandleSource {
    async fn fetch_history(
        &self,
        symbol: &str,
        _interval: KlineInterval,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_history.load(Ordering::SeqCst) {
            return Err(MarketDataError::FetchFailed {
                symbol: symbol.to_string(),
                reason: "mock history unavailable".to_string(),
            }
            .into());
        }

        let history = self.history.read().await;
        let start = history.len().saturating_sub(limit);
        debug!(
            "MockCandleSource: Serving {} historical candles for {}",
            history.len() - start,
            symbol
        );
        Ok(history[start..].to_vec())
    }

    async fn subscribe_closed_candles(
        &self,
        symbol: &str,
        interval: KlineInterval,
        mut shutdown: ShutdownSignal,
    ) -> Result<mpsc::Receiver<Candle>> {
        let (tx, rx) = mpsc::channel(100);
        let live = self.live.clone();
        let delay = self.live_delay;

        info!(
            "MockCandleSource: Replaying {} live candles for {} {}",
            live.len(),
            symbol,
            interval
        );

        tokio::spawn(async move {
            for candle in live.iter() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.changed() => return,
                }
                if tx.send(*candle).await.is_err() {
                    return;
                }
            }
            // Keep the feed open like a quiet exchange stream
            tokio::select! {
                _ = shutdown.changed() => {}
                _ = tx.closed() => {}
            }
            debug!("MockCandleSource: Live replay finished");
        });

        Ok(rx)
    }
}
