//! Support/resistance pivots, break of structure and liquidity sweeps.
//!
//! Everything here is recomputed from the full series on each cycle: whether a
//! candle is a pivot depends on the candles that follow it.

use crate::domain::market::{
    BosState, Candle, LiquiditySweep, PivotKind, PivotPoint, Pivots, StructureState,
};
use serde::Serialize;

/// Candles on each side of a pivot candidate
pub const PIVOT_WINDOW: usize = 10;
/// Number of most recent pivots of each kind checked for a sweep
pub const SWEEP_LOOKBACK: usize = 3;
/// A low below `support * 0.999` sweeps the support
pub const SUPPORT_SWEEP_FACTOR: f64 = 0.999;
/// A high above `resistance * 1.001` sweeps the resistance
pub const RESISTANCE_SWEEP_FACTOR: f64 = 1.001;
pub const BOS_MIN_CANDLES: usize = 6;

/// Structure output of one cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructureReport {
    pub pivots: Pivots,
    pub state: StructureState,
}

#[derive(Debug, Clone, Copy)]
pub struct StructureAnalyzer {
    pivot_window: usize,
}

impl Default for StructureAnalyzer {
    fn default() -> Self {
        Self::new(PIVOT_WINDOW)
    }
}

impl StructureAnalyzer {
    pub fn new(pivot_window: usize) -> Self {
        Self { pivot_window }
    }

    pub fn analyze(&self, series: &[Candle]) -> StructureReport {
        let pivots = find_pivots(series, self.pivot_window);
        let state = StructureState {
            bos: detect_bos(series),
            sweep: detect_sweep(series, &pivots),
        };
        StructureReport { pivots, state }
    }
}

/// Candles whose low (high) equals the minimum (maximum) of the inclusive
/// window `[i - window, i + window]`.
///
/// Equal extremes inside overlapping windows all qualify.
pub fn find_pivots(series: &[Candle], window: usize) -> Pivots {
    let mut pivots = Pivots::default();
    if series.len() <= 2 * window {
        return pivots;
    }

    for i in window..series.len() - window {
        let neighbourhood = &series[i - window..=i + window];
        let candle = &series[i];

        let lowest = neighbourhood
            .iter()
            .map(|c| c.low)
            .fold(f64::INFINITY, f64::min);
        let highest = neighbourhood
            .iter()
            .map(|c| c.high)
            .fold(f64::NEG_INFINITY, f64::max);

        if candle.low == lowest {
            pivots.supports.push(PivotPoint {
                time: candle.open_time,
                price: candle.low,
                kind: PivotKind::Support,
            });
        }
        if candle.high == highest {
            pivots.resistances.push(PivotPoint {
                time: candle.open_time,
                price: candle.high,
                kind: PivotKind::Resistance,
            });
        }
    }

    pivots
}

/// Break of structure from fixed offsets: the latest close against the highs
/// (lows) two and five candles back.
pub fn detect_bos(series: &[Candle]) -> BosState {
    let n = series.len();
    if n < BOS_MIN_CANDLES {
        return BosState::InsufficientData;
    }

    let latest_close = series[n - 1].close;
    let (recent, previous) = (&series[n - 2], &series[n - 5]);

    if latest_close > recent.high && recent.high > previous.high {
        BosState::BosUp
    } else if latest_close < recent.low && recent.low < previous.low {
        BosState::BosDown
    } else {
        BosState::NoBos
    }
}

/// Whether the latest candle pierced one of the most recent pivots.
///
/// Supports are checked first, so a candle sweeping both sides reports
/// `BelowSupport`.
pub fn detect_sweep(series: &[Candle], pivots: &Pivots) -> LiquiditySweep {
    let Some(current) = series.last().filter(|_| series.len() >= 2) else {
        return LiquiditySweep::NoSweep;
    };

    if pivots
        .recent_supports(SWEEP_LOOKBACK)
        .iter()
        .any(|s| current.low < s.price * SUPPORT_SWEEP_FACTOR)
    {
        return LiquiditySweep::BelowSupport;
    }

    if pivots
        .recent_resistances(SWEEP_LOOKBACK)
        .iter()
        .any(|r| current.high > r.price * RESISTANCE_SWEEP_FACTOR)
    {
        return LiquiditySweep::AboveResistance;
    }

    LiquiditySweep::NoSweep
}
