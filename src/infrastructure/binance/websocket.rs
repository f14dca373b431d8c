use crate::domain::errors::MarketDataError;
use crate::domain::market::{Candle, KlineInterval};
use crate::domain::ports::ShutdownSignal;
use crate::infrastructure::observability::Metrics;
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

const DEFAULT_MAX_BACKOFF_SECS: u64 = 60;
/// Pause before reconnecting after the server closed the stream cleanly
const GRACEFUL_RECONNECT_DELAY: Duration = Duration::from_secs(5);
const PING_INTERVAL: Duration = Duration::from_secs(180);

/// How a single connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamEnd {
    Shutdown,
    ReceiverDropped,
    ServerClosed,
}

/// Single-symbol kline stream forwarding closed candles only.
///
/// Reconnects with exponential backoff until shutdown or until the consumer
/// drops its receiver.
#[derive(Clone)]
pub struct BinanceKlineStream {
    ws_url: String,
    max_backoff_secs: u64,
    metrics: Option<Metrics>,
}

impl BinanceKlineStream {
    pub fn new(ws_url: String) -> Self {
        Self {
            ws_url,
            max_backoff_secs: DEFAULT_MAX_BACKOFF_SECS,
            metrics: None,
        }
    }

    pub fn with_max_backoff_secs(mut self, secs: u64) -> Self {
        self.max_backoff_secs = secs.max(1);
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// `{ws}/ws/{symbol}@kline_{interval}` with the symbol lowercased
    pub fn stream_url(&self, symbol: &str, interval: KlineInterval) -> Result<Url> {
        let raw = format!(
            "{}/ws/{}@kline_{}",
            self.ws_url.trim_end_matches('/'),
            symbol.to_lowercase(),
            interval.as_str()
        );
        Url::parse(&raw).with_context(|| format!("Invalid kline stream URL: {}", raw))
    }

    pub fn subscribe(
        &self,
        symbol: &str,
        interval: KlineInterval,
        shutdown: ShutdownSignal,
    ) -> Result<mpsc::Receiver<Candle>> {
        let url = self.stream_url(symbol, interval)?;
        let (tx, rx) = mpsc::channel(100);

        let max_backoff = self.max_backoff_secs;
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            Self::run_stream(url, tx, shutdown, max_backoff, metrics).await;
        });

        info!(
            "BinanceKlineStream: Spawned kline stream task for {} {}",
            symbol, interval
        );
        Ok(rx)
    }

    async fn run_stream(
        url: Url,
        tx: mpsc::Sender<Candle>,
        mut shutdown: ShutdownSignal,
        max_backoff: u64,
        metrics: Option<Metrics>,
    ) {
        let mut backoff = 1;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let delay = match Self::connect_and_stream(&url, &tx, &mut shutdown).await {
                Ok(StreamEnd::Shutdown) | Ok(StreamEnd::ReceiverDropped) => break,
                Ok(StreamEnd::ServerClosed) => {
                    info!("BinanceKlineStream: Connection closed gracefully");
                    backoff = 1;
                    GRACEFUL_RECONNECT_DELAY
                }
                Err(e) => {
                    error!(
                        "BinanceKlineStream: Stream error: {}. Reconnecting in {}s...",
                        e, backoff
                    );
                    let delay = Duration::from_secs(backoff);
                    backoff = (backoff * 2).min(max_backoff);
                    delay
                }
            };

            if let Some(metrics) = &metrics {
                metrics.stream_reconnects_total.inc();
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
                _ = tx.closed() => break,
            }
        }

        info!("BinanceKlineStream: Stream task stopped");
    }

    async fn connect_and_stream(
        url: &Url,
        tx: &mpsc::Sender<Candle>,
        shutdown: &mut ShutdownSignal,
    ) -> Result<StreamEnd> {
        info!("BinanceKlineStream: Connecting to {}", url);

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .context("Failed to connect to Binance kline stream")?;

        info!("BinanceKlineStream: Connected");

        let (mut write, mut read) = ws_stream.split();

        // All outgoing frames (pings, pongs, close) go through one writer task
        let (ws_tx, mut ws_rx) = mpsc::channel::<Message>(16);
        let writer = tokio::spawn(async move {
            while let Some(msg) = ws_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if write.send(msg).await.is_err() || closing {
                    break;
                }
            }
            let _ = write.close().await;
        });

        let mut ping_interval =
            tokio::time::interval_at(tokio::time::Instant::now() + PING_INTERVAL, PING_INTERVAL);

        let end = loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    debug!("BinanceKlineStream: Shutdown requested, closing connection");
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break Ok(StreamEnd::Shutdown);
                }
                _ = tx.closed() => {
                    debug!("BinanceKlineStream: Receiver dropped, closing connection");
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break Ok(StreamEnd::ReceiverDropped);
                }
                _ = ping_interval.tick() => {
                    let _ = ws_tx.send(Message::Ping(vec![].into())).await;
                }
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => match parse_kline_event(&text) {
                        Ok(Some(candle)) => {
                            debug!("BinanceKlineStream: Closed candle at {}", candle.open_time);
                            if tx.send(candle).await.is_err() {
                                break Ok(StreamEnd::ReceiverDropped);
                            }
                        }
                        Ok(None) => {}
                        Err(e) => warn!("BinanceKlineStream: Failed to handle message: {}", e),
                    },
                    Some(Ok(Message::Ping(payload))) => {
                        debug!("BinanceKlineStream: Received ping");
                        let _ = ws_tx.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        debug!("BinanceKlineStream: Received pong");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        if let Some(cf) = frame {
                            info!(
                                "BinanceKlineStream: Closed by server: Code {} Reason '{}'",
                                cf.code, cf.reason
                            );
                        } else {
                            info!("BinanceKlineStream: Closed by server (No info)");
                        }
                        break Ok(StreamEnd::ServerClosed);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        break Err(anyhow::Error::from(MarketDataError::ConnectionLost {
                            reason: e.to_string(),
                        }));
                    }
                    None => break Ok(StreamEnd::ServerClosed),
                },
            }
        };

        drop(ws_tx);
        let _ = writer.await;
        end
    }
}

#[derive(Debug, Deserialize)]
struct KlineEvent {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "k")]
    kline: KlinePayload,
}

#[derive(Debug, Deserialize)]
struct KlinePayload {
    #[serde(rename = "t")]
    open_time: i64,
    #[serde(rename = "o")]
    open: String,
    #[serde(rename = "h")]
    high: String,
    #[serde(rename = "l")]
    low: String,
    #[serde(rename = "c")]
    close: String,
    #[serde(rename = "v")]
    volume: String,
    #[serde(rename = "x")]
    closed: bool,
}

/// Parse a kline stream event; `None` while the kline is still forming
pub fn parse_kline_event(text: &str) -> Result<Option<Candle>> {
    let event: KlineEvent = serde_json::from_str(text).context("Not a kline event")?;
    if !event.kline.closed {
        return Ok(None);
    }

    let k = &event.kline;
    let parse = |field: &str, value: &str| -> Result<f64> {
        value.parse::<f64>().map_err(|e| {
            anyhow::Error::from(MarketDataError::InvalidData {
                symbol: event.symbol.clone(),
                reason: format!("{} '{}': {}", field, value, e),
            })
        })
    };

    Ok(Some(Candle::new(
        k.open_time,
        parse("open", &k.open)?,
        parse("high", &k.high)?,
        parse("low", &k.low)?,
        parse("close", &k.close)?,
        parse("volume", &k.volume)?,
    )))
}
