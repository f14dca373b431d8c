//! Market-structure vocabulary: swing pivots, break of structure, liquidity sweeps.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PivotKind {
    Support,
    Resistance,
}

/// A local extremum: the low (support) or high (resistance) of one candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotPoint {
    pub time: i64,
    pub price: f64,
    pub kind: PivotKind,
}

/// Pivots of one series, each list ascending by time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pivots {
    pub supports: Vec<PivotPoint>,
    pub resistances: Vec<PivotPoint>,
}

impl Pivots {
    /// The `n` most recent supports, oldest first
    pub fn recent_supports(&self, n: usize) -> &[PivotPoint] {
        let start = self.supports.len().saturating_sub(n);
        &self.supports[start..]
    }

    /// The `n` most recent resistances, oldest first
    pub fn recent_resistances(&self, n: usize) -> &[PivotPoint] {
        let start = self.resistances.len().saturating_sub(n);
        &self.resistances[start..]
    }
}

/// Break-of-structure reading for the latest candle.
///
/// `InsufficientData` counts as `NoBos` wherever a signal is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BosState {
    InsufficientData,
    NoBos,
    BosUp,
    BosDown,
}

impl fmt::Display for BosState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BosState::InsufficientData => "Not enough data for BOS",
            BosState::NoBos => "No BOS",
            BosState::BosUp => "BOS Up",
            BosState::BosDown => "BOS Down",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquiditySweep {
    NoSweep,
    BelowSupport,
    AboveResistance,
}

impl fmt::Display for LiquiditySweep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LiquiditySweep::NoSweep => "No Sweep",
            LiquiditySweep::BelowSupport => "Sweep Below Support",
            LiquiditySweep::AboveResistance => "Sweep Above Resistance",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureState {
    pub bos: BosState,
    pub sweep: LiquiditySweep,
}

impl Default for StructureState {
    fn default() -> Self {
        Self {
            bos: BosState::InsufficientData,
            sweep: LiquiditySweep::NoSweep,
        }
    }
}
