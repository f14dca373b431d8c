use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A closed OHLCV bar for one interval of the watched instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Interval open time, Unix milliseconds
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(open_time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn open_time_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.open_time)
    }

    /// All prices finite and the bar internally consistent (low <= open/close <= high).
    pub fn is_well_formed(&self) -> bool {
        let values = [self.open, self.high, self.low, self.close, self.volume];
        values.iter().all(|v| v.is_finite())
            && self.volume >= 0.0
            && self.low <= self.high
            && self.low <= self.open.min(self.close)
            && self.high >= self.open.max(self.close)
    }
}

/// Read-only view of the rolling buffer, sorted ascending by `open_time`.
///
/// Cloning is cheap; every evaluation cycle works on one of these.
pub type CandleSeries = Arc<[Candle]>;
