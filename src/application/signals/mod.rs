pub mod notification_gate;
pub mod pipeline;
pub mod signal_evaluator;

pub use notification_gate::{GateDecision, NotificationGate};
pub use pipeline::{CycleReport, NotificationOutcome, SignalPipeline, compose_message};
pub use signal_evaluator::{SignalEvaluator, SignalThresholds, rolling_volume_mean};
