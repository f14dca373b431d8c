#![allow(dead_code)]

use async_trait::async_trait;
use confluence::application::signals::CycleReport;
use confluence::application::system::PipelineStatus;
use confluence::config::{Config, Mode};
use confluence::domain::errors::NotificationError;
use confluence::domain::ports::Notifier;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

/// Records delivered messages; rejects the first `failures` attempts
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    failures: AtomicUsize,
    attempts: AtomicUsize,
}

impl RecordingNotifier {
    pub fn failing(times: usize) -> Self {
        Self {
            failures: AtomicUsize::new(times),
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotificationError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(NotificationError::Rejected {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

pub fn mock_config(refresh_secs: u64) -> Config {
    let mut config = Config::default();
    config.mode = Mode::Mock;
    config.market.refresh_interval_secs = refresh_secs;
    config.observability.enabled = false;
    config
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

/// Wait until a published status satisfies `accept`
pub async fn wait_for_status(
    status_rx: &mut watch::Receiver<PipelineStatus>,
    timeout: Duration,
    accept: impl Fn(&PipelineStatus) -> bool,
) -> PipelineStatus {
    tokio::time::timeout(timeout, async {
        loop {
            {
                let status = status_rx.borrow_and_update();
                if accept(&status) {
                    return status.clone();
                }
            }
            status_rx
                .changed()
                .await
                .expect("status channel closed before condition was met");
        }
    })
    .await
    .expect("timed out waiting for pipeline status")
}

/// Wait until an evaluated report satisfies `accept`
pub async fn wait_for_report(
    status_rx: &mut watch::Receiver<PipelineStatus>,
    timeout: Duration,
    accept: impl Fn(&CycleReport) -> bool,
) -> CycleReport {
    let status = wait_for_status(status_rx, timeout, |s| s.report().is_some_and(&accept)).await;
    status.report().cloned().expect("evaluated status")
}
