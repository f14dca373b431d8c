mod common;

use common::{RecordingNotifier, init_tracing, mock_config, wait_for_report};
use confluence::application::market_data::{IndicatorEngine, IndicatorParams};
use confluence::application::signals::{NotificationOutcome, SignalPipeline};
use confluence::application::system::Application;
use confluence::domain::market::CandleSeries;
use confluence::domain::signal::{Classification, SignalEpisode, SignalSide};
use confluence::infrastructure::mock::{
    MockCandleSource, buy_confluence_series, sell_confluence_series,
};
use confluence::infrastructure::observability::Metrics;
use confluence::interfaces::LogRenderer;
use std::sync::Arc;
use std::time::Duration;

fn pipeline(notifier: Arc<RecordingNotifier>) -> SignalPipeline {
    let engine = IndicatorEngine::new(IndicatorParams::default()).unwrap();
    SignalPipeline::new("ETHUSDT", engine, notifier)
}

fn buy() -> CandleSeries {
    buy_confluence_series(0, 60_000).into()
}

fn sell() -> CandleSeries {
    sell_confluence_series(0, 60_000).into()
}

/// Same candles without the breakout: a quiet market
fn hold() -> CandleSeries {
    let mut candles = buy_confluence_series(0, 60_000);
    candles.pop();
    candles.into()
}

#[tokio::test]
async fn test_one_notification_per_episode() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut pipeline = pipeline(notifier.clone());

    let outcomes = [
        pipeline.run_cycle(buy()).await.notification,
        pipeline.run_cycle(buy()).await.notification,
        pipeline.run_cycle(buy()).await.notification,
    ];

    assert_eq!(
        outcomes,
        [
            NotificationOutcome::Sent(SignalSide::Buy),
            NotificationOutcome::Suppressed(SignalSide::Buy),
            NotificationOutcome::Suppressed(SignalSide::Buy),
        ]
    );
    assert_eq!(notifier.messages().len(), 1);
    assert_eq!(pipeline.episode(), SignalEpisode::Active(SignalSide::Buy));
}

#[tokio::test]
async fn test_hold_rearms_the_gate() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut pipeline = pipeline(notifier.clone());

    pipeline.run_cycle(buy()).await;
    let quiet = pipeline.run_cycle(hold()).await;
    assert_eq!(quiet.snapshot.classification, Classification::Hold);
    assert_eq!(quiet.notification, NotificationOutcome::None);
    assert_eq!(quiet.episode, SignalEpisode::Inactive);

    let again = pipeline.run_cycle(buy()).await;
    assert_eq!(again.notification, NotificationOutcome::Sent(SignalSide::Buy));
    assert_eq!(notifier.messages().len(), 2);
}

#[tokio::test]
async fn test_flip_to_opposite_side_notifies() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut pipeline = pipeline(notifier.clone());

    pipeline.run_cycle(buy()).await;
    let flipped = pipeline.run_cycle(sell()).await;

    assert_eq!(flipped.notification, NotificationOutcome::Sent(SignalSide::Sell));
    assert_eq!(flipped.episode, SignalEpisode::Active(SignalSide::Sell));

    let messages = notifier.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].starts_with("STRONG BUY SIGNAL detected in ETHUSDT"));
    assert!(messages[1].starts_with("STRONG SELL SIGNAL detected in ETHUSDT"));
}

#[tokio::test]
async fn test_failed_delivery_is_retried_on_next_strong_cycle() {
    let notifier = Arc::new(RecordingNotifier::failing(2));
    let mut pipeline = pipeline(notifier.clone());

    let first = pipeline.run_cycle(buy()).await;
    assert_eq!(first.notification, NotificationOutcome::Failed(SignalSide::Buy));
    assert_eq!(first.episode, SignalEpisode::Inactive);

    let second = pipeline.run_cycle(buy()).await;
    assert_eq!(second.notification, NotificationOutcome::Failed(SignalSide::Buy));

    let third = pipeline.run_cycle(buy()).await;
    assert_eq!(third.notification, NotificationOutcome::Sent(SignalSide::Buy));

    assert_eq!(notifier.attempts(), 3);
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn test_failed_delivery_is_not_retried_after_episode_ends() {
    let notifier = Arc::new(RecordingNotifier::failing(1));
    let mut pipeline = pipeline(notifier.clone());

    pipeline.run_cycle(buy()).await;
    pipeline.run_cycle(hold()).await;

    assert_eq!(notifier.attempts(), 1);
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn test_running_application_retries_after_outage() -> anyhow::Result<()> {
    init_tracing();

    let config = mock_config(1);
    let source = Arc::new(MockCandleSource::buy_scenario(config.market.interval));
    let notifier = Arc::new(RecordingNotifier::failing(1));
    let metrics = Metrics::new()?;

    let app = Application::from_parts(
        config,
        source,
        notifier.clone(),
        Arc::new(LogRenderer),
        metrics.clone(),
    )?;
    let handle = app.start().await?;
    let mut status_rx = handle.subscribe();

    // First strong cycle fails, the following backfill delivers
    wait_for_report(&mut status_rx, Duration::from_secs(5), |r| {
        r.notification == NotificationOutcome::Sent(SignalSide::Buy)
    })
    .await;

    assert_eq!(notifier.attempts(), 2);
    assert_eq!(notifier.messages().len(), 1);
    assert_eq!(metrics.notification_count("buy", "failed"), 1.0);
    assert_eq!(metrics.notification_count("buy", "sent"), 1.0);

    handle.shutdown().await
}
