use thiserror::Error;

/// Errors related to market data and connectivity
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Connection lost: {reason}")]
    ConnectionLost { reason: String },

    #[error("History fetch failed for {symbol}: {reason}")]
    FetchFailed { symbol: String, reason: String },

    #[error("Invalid market data for {symbol}: {reason}")]
    InvalidData { symbol: String, reason: String },

    #[error("Service timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

/// Errors raised while delivering an outbound notification.
///
/// These never abort an evaluation cycle; the pipeline only records them.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification send failed: {reason}")]
    SendFailed { reason: String },

    #[error("Notification rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Notifier is not configured: {reason}")]
    NotConfigured { reason: String },
}

/// Errors related to indicator parameterisation
#[derive(Debug, Error)]
pub enum IndicatorError {
    #[error("Invalid period for {indicator}: {period}")]
    InvalidPeriod { indicator: &'static str, period: usize },

    #[error("Indicator {indicator} could not be built: {reason}")]
    Construction {
        indicator: &'static str,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_data_error_formatting() {
        let error = MarketDataError::FetchFailed {
            symbol: "BTCUSDT".to_string(),
            reason: "HTTP 503".to_string(),
        };

        let msg = error.to_string();
        assert!(msg.contains("BTCUSDT"));
        assert!(msg.contains("HTTP 503"));
    }

    #[test]
    fn test_notification_error_formatting() {
        let error = NotificationError::Rejected {
            status: 401,
            body: "Authenticate".to_string(),
        };

        let msg = error.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("Authenticate"));
    }
}
