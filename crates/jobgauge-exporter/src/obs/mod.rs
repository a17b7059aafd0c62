//! In-process metrics about the exporter itself.
//!
//! Stored as atomics and rendered by the `/metrics` handler after the
//! published gauges.

pub mod metrics;

pub use metrics::{CounterVec, ExporterMetrics};
