use crate::application::market_data::{CandleStore, IndicatorEngine, IndicatorParams, IngestOutcome};
use crate::application::signals::{CycleReport, SignalPipeline};
use crate::config::{Config, Mode};
use crate::domain::market::{Candle, KlineInterval};
use crate::domain::ports::{CandleSource, Notifier, ShutdownSignal};
use crate::infrastructure::binance::BinanceCandleSource;
use crate::infrastructure::mock::MockCandleSource;
use crate::infrastructure::notifications::{LogNotifier, TwilioNotifier};
use crate::infrastructure::observability::Metrics;
use crate::interfaces::{LogRenderer, Renderer};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A change for the store owner to apply
#[derive(Debug, Clone)]
pub enum StoreUpdate {
    /// Full REST history, newest element provisional
    History(Vec<Candle>),
    /// One closed candle from the live feed
    Live(Candle),
}

/// Latest state published by the evaluation task
#[derive(Debug, Clone)]
pub enum PipelineStatus {
    Starting,
    /// Candles are buffered but no live closed candle arrived yet
    AwaitingLiveData { buffered: usize },
    Evaluated(Arc<CycleReport>),
}

impl PipelineStatus {
    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            PipelineStatus::Evaluated(report) => Some(report),
            _ => None,
        }
    }
}

pub struct Application {
    pub config: Config,
    source: Arc<dyn CandleSource>,
    pipeline: SignalPipeline,
    renderer: Arc<dyn Renderer>,
    metrics: Metrics,
}

impl Application {
    /// Wire the collaborators selected by `config`
    pub async fn build(config: Config) -> Result<Self> {
        info!(
            "Building Confluence Application (Mode: {:?}, Symbol: {}, Interval: {})...",
            config.mode, config.market.symbol, config.market.interval
        );

        let metrics = Metrics::new()?;

        let source: Arc<dyn CandleSource> = match config.mode {
            Mode::Binance => Arc::new(
                BinanceCandleSource::builder()
                    .base_url(config.market.binance_base_url.clone())
                    .ws_url(config.market.binance_ws_url.clone())
                    .max_backoff_secs(config.market.stream_max_backoff_secs)
                    .metrics(metrics.clone())
                    .build()?,
            ),
            Mode::Mock => Arc::new(MockCandleSource::buy_scenario(config.market.interval)),
        };

        let notifier = Self::build_notifier(&config);

        Self::from_parts(config, source, notifier, Arc::new(LogRenderer), metrics)
    }

    fn build_notifier(config: &Config) -> Arc<dyn Notifier> {
        if config.mode == Mode::Mock || !config.notifier.is_configured() {
            info!("Application: Twilio not configured, alerts go to the log");
            return Arc::new(LogNotifier);
        }

        let n = &config.notifier;
        match TwilioNotifier::new(
            n.twilio_api_url.clone(),
            n.twilio_sid.clone(),
            n.twilio_auth_token.clone(),
            n.twilio_from.clone(),
            n.twilio_to.clone(),
        ) {
            Ok(twilio) => {
                info!("Application: Alerts will be sent via Twilio to {}", n.twilio_to);
                Arc::new(twilio)
            }
            Err(e) => {
                warn!("Application: {}. Falling back to log alerts.", e);
                Arc::new(LogNotifier)
            }
        }
    }

    /// Assemble an application from explicit collaborators
    pub fn from_parts(
        config: Config,
        source: Arc<dyn CandleSource>,
        notifier: Arc<dyn Notifier>,
        renderer: Arc<dyn Renderer>,
        metrics: Metrics,
    ) -> Result<Self> {
        config.validate()?;

        let engine = IndicatorEngine::new(IndicatorParams::default())
            .context("Invalid indicator parameters")?;
        let pipeline = SignalPipeline::new(config.market.symbol.clone(), engine, notifier)
            .with_metrics(metrics.clone());

        Ok(Self {
            config,
            source,
            pipeline,
            renderer,
            metrics,
        })
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Spawn the live listener, the periodic backfill and the store owner
    pub async fn start(self) -> Result<ApplicationHandle> {
        let market = self.config.market.clone();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (update_tx, update_rx) = mpsc::channel(64);
        let (status_tx, status_rx) = watch::channel(PipelineStatus::Starting);

        let live_rx = self
            .source
            .subscribe_closed_candles(&market.symbol, market.interval, shutdown_rx.clone())
            .await
            .context("Failed to subscribe to live candles")?;

        info!("Starting tasks...");

        let live_task = tokio::spawn(run_live_listener(
            live_rx,
            update_tx.clone(),
            shutdown_rx.clone(),
        ));

        let backfill_task = tokio::spawn(run_backfill(
            self.source.clone(),
            BackfillSettings {
                symbol: market.symbol.clone(),
                interval: market.interval,
                limit: market.history_limit,
                every: Duration::from_secs(market.refresh_interval_secs),
            },
            update_tx,
            self.metrics.clone(),
            shutdown_rx.clone(),
        ));

        let owner = StoreOwner {
            store: CandleStore::new(market.history_limit),
            pipeline: self.pipeline,
            renderer: self.renderer,
            metrics: self.metrics.clone(),
            status_tx,
        };
        let owner_task = tokio::spawn(owner.run(update_rx, shutdown_rx));

        info!("Confluence running for {} {}", market.symbol, market.interval);

        Ok(ApplicationHandle {
            metrics: self.metrics,
            status_rx,
            shutdown_tx,
            tasks: vec![live_task, backfill_task, owner_task],
        })
    }

    /// One backfill and one evaluation, using the newest closed REST candle
    /// in place of a live one.
    pub async fn run_once(mut self) -> Result<CycleReport> {
        let market = &self.config.market;
        let history = self
            .source
            .fetch_history(&market.symbol, market.interval, market.history_limit)
            .await
            .context("Failed to fetch history")?;

        if history.len() < 2 {
            anyhow::bail!(
                "Not enough history for {}: got {} candles",
                market.symbol,
                history.len()
            );
        }
        let newest_closed = history[history.len() - 2];

        let mut store = CandleStore::new(market.history_limit);
        let outcome = store.ingest(&history, Some(newest_closed));
        record_ingest(&self.metrics, &outcome);

        let report = self.pipeline.run_cycle(store.snapshot()).await;
        self.renderer.render(&report);
        Ok(report)
    }
}

/// Running application
pub struct ApplicationHandle {
    pub metrics: Metrics,
    status_rx: watch::Receiver<PipelineStatus>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ApplicationHandle {
    /// Receiver of every status the evaluation task publishes
    pub fn subscribe(&self) -> watch::Receiver<PipelineStatus> {
        self.status_rx.clone()
    }

    pub fn latest(&self) -> PipelineStatus {
        self.status_rx.borrow().clone()
    }

    /// Signal that fires when [`ApplicationHandle::shutdown`] is called
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown_tx.subscribe()
    }

    /// Stop every task and wait for them to finish
    pub async fn shutdown(self) -> Result<()> {
        info!("Initiating Graceful Shutdown Sequence...");
        let _ = self.shutdown_tx.send(true);

        for task in self.tasks {
            task.await.context("Task panicked during shutdown")?;
        }

        info!("Shutdown sequence completed.");
        Ok(())
    }
}

async fn run_live_listener(
    mut live_rx: mpsc::Receiver<Candle>,
    update_tx: mpsc::Sender<StoreUpdate>,
    mut shutdown: ShutdownSignal,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            candle = live_rx.recv() => match candle {
                Some(candle) => {
                    if update_tx.send(StoreUpdate::Live(candle)).await.is_err() {
                        break;
                    }
                }
                None => {
                    warn!("LiveListener: Live feed ended");
                    break;
                }
            },
        }
    }
    debug!("LiveListener: Stopped");
}

struct BackfillSettings {
    symbol: String,
    interval: KlineInterval,
    limit: usize,
    every: Duration,
}

async fn run_backfill(
    source: Arc<dyn CandleSource>,
    settings: BackfillSettings,
    update_tx: mpsc::Sender<StoreUpdate>,
    metrics: Metrics,
    mut shutdown: ShutdownSignal,
) {
    // First tick fires immediately
    let mut ticker = tokio::time::interval(settings.every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            _ = shutdown.changed() => break,
            result = source.fetch_history(&settings.symbol, settings.interval, settings.limit) => result,
        };

        match result {
            Ok(history) => {
                if update_tx.send(StoreUpdate::History(history)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                // The store keeps its previous contents
                metrics.backfill_failures_total.inc();
                warn!(
                    "Backfill: Failed to refresh {} history: {:#}",
                    settings.symbol, e
                );
            }
        }
    }
    debug!("Backfill: Stopped");
}

fn record_ingest(metrics: &Metrics, outcome: &IngestOutcome) {
    if let Some(len) = outcome.history_len {
        metrics.record_ingested("history", len);
    }
    if outcome.live_appended || outcome.replaced_last {
        metrics.record_ingested("live", 1);
    }
    if outcome.rejected > 0 {
        metrics.candles_rejected_total.inc_by(outcome.rejected as f64);
    }
}

/// Single owner of the candle store; evaluates after every update
struct StoreOwner {
    store: CandleStore,
    pipeline: SignalPipeline,
    renderer: Arc<dyn Renderer>,
    metrics: Metrics,
    status_tx: watch::Sender<PipelineStatus>,
}

impl StoreOwner {
    async fn run(mut self, mut update_rx: mpsc::Receiver<StoreUpdate>, mut shutdown: ShutdownSignal) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                update = update_rx.recv() => match update {
                    Some(update) => self.apply(update).await,
                    None => break,
                },
            }
        }
        debug!("StoreOwner: Stopped");
    }

    async fn apply(&mut self, update: StoreUpdate) {
        let outcome = match update {
            StoreUpdate::History(history) => self.store.apply_history(&history),
            StoreUpdate::Live(candle) => self.store.apply_live(candle),
        };
        record_ingest(&self.metrics, &outcome);

        if !self.store.has_live() {
            debug!(
                "StoreOwner: {} candles buffered, waiting for live data",
                self.store.len()
            );
            self.status_tx.send_replace(PipelineStatus::AwaitingLiveData {
                buffered: self.store.len(),
            });
            return;
        }

        let report = self.pipeline.run_cycle(self.store.snapshot()).await;
        self.renderer.render(&report);
        self.status_tx
            .send_replace(PipelineStatus::Evaluated(Arc::new(report)));
    }
}
