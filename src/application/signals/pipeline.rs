use super::notification_gate::{GateDecision, NotificationGate};
use super::signal_evaluator::SignalEvaluator;
use crate::application::market_data::{
    IndicatorEngine, IndicatorRow, StructureAnalyzer, StructureReport,
};
use crate::domain::market::{Candle, CandleSeries};
use crate::domain::ports::Notifier;
use crate::domain::signal::{SignalEpisode, SignalSide, SignalSnapshot};
use crate::infrastructure::observability::Metrics;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened on the notification side of one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Hold; nothing to send
    None,
    Sent(SignalSide),
    /// Delivery failed; the next strong cycle of this side retries
    Failed(SignalSide),
    /// The running episode was already notified
    Suppressed(SignalSide),
}

impl NotificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationOutcome::None => "none",
            NotificationOutcome::Sent(_) => "sent",
            NotificationOutcome::Failed(_) => "failed",
            NotificationOutcome::Suppressed(_) => "suppressed",
        }
    }

    fn side(&self) -> Option<SignalSide> {
        match self {
            NotificationOutcome::None => None,
            NotificationOutcome::Sent(side)
            | NotificationOutcome::Failed(side)
            | NotificationOutcome::Suppressed(side) => Some(*side),
        }
    }
}

/// Everything one evaluation cycle produced, ready for rendering
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub symbol: String,
    pub evaluated_at: DateTime<Utc>,
    pub series: CandleSeries,
    /// One row per candle of `series`
    pub indicators: Vec<IndicatorRow>,
    pub structure: StructureReport,
    pub snapshot: SignalSnapshot,
    /// Gate state after this cycle
    pub episode: SignalEpisode,
    pub notification: NotificationOutcome,
}

impl CycleReport {
    pub fn latest_candle(&self) -> Option<&Candle> {
        self.series.last()
    }

    pub fn latest_indicators(&self) -> Option<&IndicatorRow> {
        self.indicators.last()
    }
}

/// Indicators, structure, classification and notification for one series.
///
/// Owns the notification gate, so a single pipeline instance must see every
/// cycle of its symbol in order.
pub struct SignalPipeline {
    symbol: String,
    engine: IndicatorEngine,
    analyzer: StructureAnalyzer,
    evaluator: SignalEvaluator,
    gate: NotificationGate,
    notifier: Arc<dyn Notifier>,
    metrics: Option<Metrics>,
}

impl SignalPipeline {
    pub fn new(symbol: impl Into<String>, engine: IndicatorEngine, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            symbol: symbol.into(),
            engine,
            analyzer: StructureAnalyzer::default(),
            evaluator: SignalEvaluator::default(),
            gate: NotificationGate::new(),
            notifier,
            metrics: None,
        }
    }

    pub fn with_analyzer(mut self, analyzer: StructureAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_evaluator(mut self, evaluator: SignalEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn episode(&self) -> SignalEpisode {
        self.gate.episode()
    }

    /// Classify `series` without touching the gate or the notifier
    pub fn evaluate(&self, series: CandleSeries) -> CycleReport {
        let indicators = self.engine.compute(&series);
        let structure = self.analyzer.analyze(&series);
        let snapshot = self
            .evaluator
            .evaluate_series(&series, &indicators, &structure.state);

        debug!(
            "SignalPipeline: {} candles for {} -> {} (BOS: {}, sweep: {})",
            series.len(),
            self.symbol,
            snapshot.classification,
            structure.state.bos,
            structure.state.sweep
        );

        CycleReport {
            symbol: self.symbol.clone(),
            evaluated_at: Utc::now(),
            series,
            indicators,
            structure,
            snapshot,
            episode: self.gate.episode(),
            notification: NotificationOutcome::None,
        }
    }

    /// Full cycle: evaluate, pass the classification through the gate and
    /// notify on a new episode.
    ///
    /// A failed delivery is logged and reported, never propagated.
    pub async fn run_cycle(&mut self, series: CandleSeries) -> CycleReport {
        let mut report = self.evaluate(series);

        report.notification = match self.gate.on_signal(report.snapshot.classification) {
            GateDecision::Idle => NotificationOutcome::None,
            GateDecision::AlreadyNotified(side) => {
                debug!(
                    "SignalPipeline: {} episode already notified for {}",
                    side.as_str(),
                    self.symbol
                );
                NotificationOutcome::Suppressed(side)
            }
            GateDecision::Notify(side) => {
                let message = compose_message(&self.symbol, side, &report.snapshot);
                match self.notifier.notify(&message).await {
                    Ok(()) => {
                        self.gate.confirm_delivery(side);
                        info!(
                            "SignalPipeline: {} notification sent via {} for {}",
                            side.as_str(),
                            self.notifier.name(),
                            self.symbol
                        );
                        NotificationOutcome::Sent(side)
                    }
                    Err(e) => {
                        warn!(
                            "SignalPipeline: {} notification via {} failed: {}. Will retry next cycle.",
                            side.as_str(),
                            self.notifier.name(),
                            e
                        );
                        NotificationOutcome::Failed(side)
                    }
                }
            }
        };
        report.episode = self.gate.episode();

        self.record(&report);
        report
    }

    fn record(&self, report: &CycleReport) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        metrics.record_classification(report.snapshot.classification);
        if let Some(close) = report.snapshot.close {
            metrics.last_close.set(close);
        }
        if let Some(rsi) = report.snapshot.rsi {
            metrics.last_rsi.set(rsi);
        }
        if let Some(side) = report.notification.side() {
            metrics.record_notification(side.as_str(), report.notification.as_str());
        }
    }
}

/// Alert text for a new strong signal episode
pub fn compose_message(symbol: &str, side: SignalSide, snapshot: &SignalSnapshot) -> String {
    let headline = match side {
        SignalSide::Buy => "STRONG BUY SIGNAL",
        SignalSide::Sell => "STRONG SELL SIGNAL",
    };
    let close = snapshot
        .close
        .map(|c| format!("{:.2}", c))
        .unwrap_or_else(|| "n/a".to_string());
    let rsi = snapshot
        .rsi
        .map(|r| format!("{:.2}", r))
        .unwrap_or_else(|| "n/a".to_string());

    format!(
        "{} detected in {}\nClose: {}\nRSI: {}",
        headline, symbol, close, rsi
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::market_data::IndicatorParams;
    use crate::domain::errors::NotificationError;
    use crate::domain::market::{BosState, LiquiditySweep};
    use crate::domain::signal::Classification;
    use crate::infrastructure::mock::{buy_confluence_series, sell_confluence_series};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records messages; fails the first `failures` calls
    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
        failures: AtomicUsize,
    }

    impl RecordingNotifier {
        fn failing(times: usize) -> Self {
            Self {
                messages: Mutex::new(Vec::new()),
                failures: AtomicUsize::new(times),
            }
        }

        fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, message: &str) -> Result<(), NotificationError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(NotificationError::SendFailed {
                    reason: "simulated outage".to_string(),
                });
            }
            self.messages.lock().unwrap().push(message.to_string());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    fn pipeline(notifier: Arc<RecordingNotifier>) -> SignalPipeline {
        let engine = IndicatorEngine::new(IndicatorParams::default()).unwrap();
        SignalPipeline::new("BTCUSDT", engine, notifier)
    }

    fn series(candles: Vec<Candle>) -> CandleSeries {
        candles.into()
    }

    #[test]
    fn test_evaluate_buy_confluence() {
        let notifier = Arc::new(RecordingNotifier::default());
        let report = pipeline(notifier.clone()).evaluate(series(buy_confluence_series(0, 60_000)));

        assert_eq!(report.snapshot.classification, Classification::StrongBuy);
        assert_eq!(report.structure.state.bos, BosState::BosUp);
        assert_eq!(report.structure.state.sweep, LiquiditySweep::BelowSupport);
        assert_eq!(report.indicators.len(), 500);
        assert_eq!(report.notification, NotificationOutcome::None);
        assert!(notifier.messages().is_empty());
    }

    #[test]
    fn test_evaluate_sell_confluence() {
        let notifier = Arc::new(RecordingNotifier::default());
        let report = pipeline(notifier).evaluate(series(sell_confluence_series(0, 60_000)));

        assert_eq!(report.snapshot.classification, Classification::StrongSell);
        assert_eq!(report.structure.state.bos, BosState::BosDown);
        assert_eq!(report.structure.state.sweep, LiquiditySweep::AboveResistance);
    }

    #[test]
    fn test_short_series_holds() {
        let notifier = Arc::new(RecordingNotifier::default());
        let candles = buy_confluence_series(0, 60_000)[..10].to_vec();
        let report = pipeline(notifier).evaluate(series(candles));

        assert_eq!(report.snapshot.classification, Classification::Hold);
        assert!(!report.snapshot.ready);
        assert!(report.latest_indicators().is_some_and(|row| row.sma20.is_none()));
    }

    #[tokio::test]
    async fn test_run_cycle_notifies_once_per_episode() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut pipeline = pipeline(notifier.clone());
        let buy = series(buy_confluence_series(0, 60_000));

        let first = pipeline.run_cycle(buy.clone()).await;
        assert_eq!(first.notification, NotificationOutcome::Sent(SignalSide::Buy));
        assert_eq!(first.episode, SignalEpisode::Active(SignalSide::Buy));

        let second = pipeline.run_cycle(buy).await;
        assert_eq!(second.notification, NotificationOutcome::Suppressed(SignalSide::Buy));

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("STRONG BUY SIGNAL detected in BTCUSDT"));
        assert!(messages[0].contains("Close: 100.03"));
    }

    #[tokio::test]
    async fn test_hold_between_signals_starts_new_episode() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut pipeline = pipeline(notifier.clone());
        let buy = buy_confluence_series(0, 60_000);
        let hold = series(buy[..499].to_vec());
        let buy = series(buy);

        pipeline.run_cycle(buy.clone()).await;
        let idle = pipeline.run_cycle(hold).await;
        assert_eq!(idle.snapshot.classification, Classification::Hold);
        assert_eq!(idle.episode, SignalEpisode::Inactive);

        let again = pipeline.run_cycle(buy).await;
        assert_eq!(again.notification, NotificationOutcome::Sent(SignalSide::Buy));
        assert_eq!(notifier.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_delivery_retried_next_cycle() {
        let notifier = Arc::new(RecordingNotifier::failing(1));
        let metrics = Metrics::new().unwrap();
        let mut pipeline = pipeline(notifier.clone()).with_metrics(metrics.clone());
        let sell = series(sell_confluence_series(0, 60_000));

        let failed = pipeline.run_cycle(sell.clone()).await;
        assert_eq!(failed.notification, NotificationOutcome::Failed(SignalSide::Sell));
        assert_eq!(failed.episode, SignalEpisode::Inactive);

        let retried = pipeline.run_cycle(sell).await;
        assert_eq!(retried.notification, NotificationOutcome::Sent(SignalSide::Sell));
        assert_eq!(notifier.messages().len(), 1);

        assert_eq!(metrics.notification_count("sell", "failed"), 1.0);
        assert_eq!(metrics.notification_count("sell", "sent"), 1.0);
        assert_eq!(metrics.cycles_total.get(), 2.0);
    }

    #[test]
    fn test_compose_message_without_values() {
        let snapshot = SignalSnapshot::not_ready(BosState::NoBos, LiquiditySweep::NoSweep);
        let message = compose_message("ETHUSDT", SignalSide::Sell, &snapshot);
        assert_eq!(
            message,
            "STRONG SELL SIGNAL detected in ETHUSDT\nClose: n/a\nRSI: n/a"
        );
    }
}
