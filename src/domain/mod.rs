// Candles, intervals and market structure
pub mod market;

// Signal classification and episode state
pub mod signal;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
