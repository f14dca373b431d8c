use crate::domain::errors::NotificationError;
use crate::domain::ports::Notifier;
use async_trait::async_trait;
use tracing::info;

/// Writes alerts to the log instead of an external channel
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotificationError> {
        info!("LogNotifier: {}", message.replace('\n', " | "));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
