//! Push-based observability for Confluence
//!
//! Observability is **outbound data only**: no HTTP server, no incoming requests.
//! Metrics live in a Prometheus registry and are pushed as periodic structured
//! JSON log lines.

pub mod metrics;
pub mod reporter;

pub use metrics::Metrics;
pub use reporter::MetricsReporter;
