//! # simreport telemetry
//!
//! Self-observability for the reporting client: `tracing` diagnostics about
//! the client itself and Prometheus counters for what it delivered. None of
//! this is simulation telemetry; that flows through the reporting sinks.

pub mod logging;
pub mod metrics;

pub use logging::ReportLogger;
pub use metrics::ReportMetrics;
