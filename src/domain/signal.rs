use super::market::{BosState, LiquiditySweep};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a strong signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalSide {
    Buy,
    Sell,
}

impl SignalSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSide::Buy => "buy",
            SignalSide::Sell => "sell",
        }
    }
}

/// Outcome of one evaluation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Hold,
    StrongBuy,
    StrongSell,
}

impl Classification {
    pub fn strong_side(&self) -> Option<SignalSide> {
        match self {
            Classification::Hold => None,
            Classification::StrongBuy => Some(SignalSide::Buy),
            Classification::StrongSell => Some(SignalSide::Sell),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Hold => "hold",
            Classification::StrongBuy => "strong_buy",
            Classification::StrongSell => "strong_sell",
        }
    }
}

impl From<SignalSide> for Classification {
    fn from(side: SignalSide) -> Self {
        match side {
            SignalSide::Buy => Classification::StrongBuy,
            SignalSide::Sell => Classification::StrongSell,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Classification::Hold => "HOLD",
            Classification::StrongBuy => "STRONG BUY",
            Classification::StrongSell => "STRONG SELL",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Uptrend,
    Downtrend,
    Sideways,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Uptrend => "Uptrend",
            Trend::Downtrend => "Downtrend",
            Trend::Sideways => "Sideways",
        };
        write!(f, "{}", label)
    }
}

/// Every sub-condition behind a classification, kept for display and audit.
///
/// Raw values are `None` while the corresponding indicator is not ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub classification: Classification,
    /// All indicators needed for a decision were defined
    pub ready: bool,
    pub trend: Trend,
    pub rsi_buy: bool,
    pub rsi_sell: bool,
    pub macd_buy: bool,
    pub macd_sell: bool,
    pub bollinger_buy: bool,
    pub bollinger_sell: bool,
    pub high_volume: bool,
    pub bos: BosState,
    pub sweep: LiquiditySweep,
    pub close: Option<f64>,
    pub rsi: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub volume: Option<f64>,
    pub volume_average: Option<f64>,
}

impl SignalSnapshot {
    /// Snapshot for a cycle that could not be decided
    pub fn not_ready(bos: BosState, sweep: LiquiditySweep) -> Self {
        Self {
            classification: Classification::Hold,
            ready: false,
            trend: Trend::Sideways,
            rsi_buy: false,
            rsi_sell: false,
            macd_buy: false,
            macd_sell: false,
            bollinger_buy: false,
            bollinger_sell: false,
            high_volume: false,
            bos,
            sweep,
            close: None,
            rsi: None,
            macd_histogram: None,
            volume: None,
            volume_average: None,
        }
    }
}

/// Latch state owned by the notification gate.
///
/// `Active(side)` means a notification for the current run of `side`
/// classifications has been delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignalEpisode {
    #[default]
    Inactive,
    Active(SignalSide),
}

impl SignalEpisode {
    pub fn is_active(&self) -> bool {
        matches!(self, SignalEpisode::Active(_))
    }

    pub fn side(&self) -> Option<SignalSide> {
        match self {
            SignalEpisode::Inactive => None,
            SignalEpisode::Active(side) => Some(*side),
        }
    }
}
