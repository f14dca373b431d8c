//! Confluence - headless candle analytics
//!
//! Keeps a rolling window of closed candles for one symbol, evaluates the
//! indicator and market-structure confluence after every update, and alerts
//! once per strong buy or sell episode. Metrics are pushed via structured
//! JSON logs to stdout.
//!
//! # Usage
//! ```sh
//! SYMBOL=ETHUSDT KLINE_INTERVAL=5m cargo run
//! cargo run -- --mode mock
//! cargo run -- --once
//! ```

use anyhow::Result;
use clap::Parser;
use confluence::application::system::Application;
use confluence::config::{Config, Mode};
use confluence::domain::market::KlineInterval;
use confluence::infrastructure::observability::MetricsReporter;
use std::str::FromStr;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Candle source: binance or mock (overrides MODE)
    #[arg(long)]
    mode: Option<String>,

    /// Trading pair, e.g. BTCUSDT (overrides SYMBOL)
    #[arg(short, long)]
    symbol: Option<String>,

    /// Kline interval, e.g. 1m, 15m, 1h (overrides KLINE_INTERVAL)
    #[arg(short, long)]
    interval: Option<String>,

    /// Seconds between history backfills (overrides REFRESH_INTERVAL_SECS)
    #[arg(long)]
    refresh: Option<u64>,

    /// Run a single evaluation on REST history and exit
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(mode) = &self.mode {
            config.mode = Mode::from_str(mode)?;
        }
        if let Some(symbol) = &self.symbol {
            config.market.symbol = symbol.trim().to_uppercase();
        }
        if let Some(interval) = &self.interval {
            config.market.interval = KlineInterval::from_str(interval)?;
        }
        if let Some(refresh) = self.refresh {
            config.market.refresh_interval_secs = refresh;
        }
        config.validate()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Confluence {} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = Config::from_env()?;
    cli.apply(&mut config)?;
    info!(
        "Configuration loaded: Mode={:?}, Symbol={}, Interval={}, History={}",
        config.mode, config.market.symbol, config.market.interval, config.market.history_limit
    );

    let app = Application::build(config.clone()).await?;

    if cli.once {
        let report = app.run_once().await?;
        info!(
            "Single evaluation finished: {}",
            report.snapshot.classification
        );
        return Ok(());
    }

    let handle = app.start().await?;

    if config.observability.enabled {
        let reporter = MetricsReporter::new(
            config.market.symbol.clone(),
            handle.metrics.clone(),
            config.observability.interval_secs,
        );
        tokio::spawn(reporter.run(handle.shutdown_signal()));
        info!(
            "Metrics reporter started (interval: {}s)",
            config.observability.interval_secs
        );
    } else {
        info!("Metrics reporting disabled.");
    }

    info!("Running. Press Ctrl+C to shutdown.");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received.");

    handle.shutdown().await
}
