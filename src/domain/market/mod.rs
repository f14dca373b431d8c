// Candles and the rolling series view
pub mod candle;

// Kline interval vocabulary
pub mod interval;

// Pivots, BOS and sweep types
pub mod structure;

pub use candle::{Candle, CandleSeries};
pub use interval::KlineInterval;
pub use structure::{BosState, LiquiditySweep, PivotKind, PivotPoint, Pivots, StructureState};
