pub mod candle_store;
pub mod indicator_engine;
pub mod structure_analyzer;

pub use candle_store::{CandleStore, IngestOutcome};
pub use indicator_engine::{IndicatorEngine, IndicatorParams, IndicatorRow};
pub use structure_analyzer::{StructureAnalyzer, StructureReport};
