use crate::domain::errors::NotificationError;
use crate::domain::market::{Candle, KlineInterval};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{mpsc::Receiver, watch};

/// Fires `true` once when the application shuts down
pub type ShutdownSignal = watch::Receiver<bool>;

#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Most recent `limit` candles, ascending by open time.
    ///
    /// The last element is the interval still in progress.
    async fn fetch_history(
        &self,
        symbol: &str,
        interval: KlineInterval,
        limit: usize,
    ) -> Result<Vec<Candle>>;

    /// Live feed yielding only closed candles.
    ///
    /// The feed reconnects on its own and ends when `shutdown` fires or the
    /// receiver is dropped.
    async fn subscribe_closed_candles(
        &self,
        symbol: &str,
        interval: KlineInterval,
        shutdown: ShutdownSignal,
    ) -> Result<Receiver<Candle>>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), NotificationError>;

    /// Short name for logs and metrics labels
    fn name(&self) -> &'static str;
}
