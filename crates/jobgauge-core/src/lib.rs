//! jobgauge core: metric definitions, the gauge registry, and the error surface.
//!
//! This crate carries no runtime or transport dependencies. The exporter crate
//! owns scheduling, data sources and HTTP; everything here is plain data plus
//! lock-free atomics so it can be shared between a sampler and any number of
//! concurrent scrapes.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here.
//! All fallible paths surface as `JobGaugeError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metric;
pub mod registry;

/// Shared result type.
pub use error::{Result, JobGaugeError};
pub use metric::{MetricDef, MetricKind};
pub use registry::{Gauge, Registry, Sample};
