use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kline intervals accepted by the exchange REST and stream endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KlineInterval {
    OneMin,
    ThreeMin,
    FiveMin,
    FifteenMin,
    ThirtyMin,
    OneHour,
    TwoHour,
    FourHour,
    SixHour,
    EightHour,
    TwelveHour,
    OneDay,
    ThreeDay,
    OneWeek,
    OneMonth,
}

impl KlineInterval {
    /// Interval string as used in `/api/v3/klines` and `@kline_<interval>` streams
    pub fn as_str(&self) -> &'static str {
        match self {
            KlineInterval::OneMin => "1m",
            KlineInterval::ThreeMin => "3m",
            KlineInterval::FiveMin => "5m",
            KlineInterval::FifteenMin => "15m",
            KlineInterval::ThirtyMin => "30m",
            KlineInterval::OneHour => "1h",
            KlineInterval::TwoHour => "2h",
            KlineInterval::FourHour => "4h",
            KlineInterval::SixHour => "6h",
            KlineInterval::EightHour => "8h",
            KlineInterval::TwelveHour => "12h",
            KlineInterval::OneDay => "1d",
            KlineInterval::ThreeDay => "3d",
            KlineInterval::OneWeek => "1w",
            KlineInterval::OneMonth => "1M",
        }
    }

    /// Nominal length in minutes (a month counts as 30 days)
    pub fn to_minutes(&self) -> i64 {
        match self {
            KlineInterval::OneMin => 1,
            KlineInterval::ThreeMin => 3,
            KlineInterval::FiveMin => 5,
            KlineInterval::FifteenMin => 15,
            KlineInterval::ThirtyMin => 30,
            KlineInterval::OneHour => 60,
            KlineInterval::TwoHour => 120,
            KlineInterval::FourHour => 240,
            KlineInterval::SixHour => 360,
            KlineInterval::EightHour => 480,
            KlineInterval::TwelveHour => 720,
            KlineInterval::OneDay => 1440,
            KlineInterval::ThreeDay => 4320,
            KlineInterval::OneWeek => 10080,
            KlineInterval::OneMonth => 43200,
        }
    }

    pub fn to_millis(&self) -> i64 {
        self.to_minutes() * 60_000
    }
}

impl FromStr for KlineInterval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        // "1M" (month) and "1m" (minute) differ only by case
        match s.trim() {
            "1M" => return Ok(KlineInterval::OneMonth),
            "1m" => return Ok(KlineInterval::OneMin),
            _ => {}
        }

        match s.trim().to_lowercase().as_str() {
            "1min" => Ok(KlineInterval::OneMin),
            "3m" | "3min" => Ok(KlineInterval::ThreeMin),
            "5m" | "5min" => Ok(KlineInterval::FiveMin),
            "15m" | "15min" => Ok(KlineInterval::FifteenMin),
            "30m" | "30min" => Ok(KlineInterval::ThirtyMin),
            "1h" => Ok(KlineInterval::OneHour),
            "2h" => Ok(KlineInterval::TwoHour),
            "4h" => Ok(KlineInterval::FourHour),
            "6h" => Ok(KlineInterval::SixHour),
            "8h" => Ok(KlineInterval::EightHour),
            "12h" => Ok(KlineInterval::TwelveHour),
            "1d" => Ok(KlineInterval::OneDay),
            "3d" => Ok(KlineInterval::ThreeDay),
            "1w" => Ok(KlineInterval::OneWeek),
            _ => Err(anyhow!(
                "Invalid kline interval: '{}'. Valid options: 1m, 3m, 5m, 15m, 30m, 1h, 2h, 4h, 6h, 8h, 12h, 1d, 3d, 1w, 1M",
                s
            )),
        }
    }
}

impl fmt::Display for KlineInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
