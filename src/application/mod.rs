// Candle buffering, indicators and market structure
pub mod market_data;

// Classification, notification gating and the evaluation cycle
pub mod signals;

// System orchestrator
pub mod system;
