//! jobgauge exporter library entry.
//!
//! Wires configuration, the pluggable metric sources, the sampler loop and the
//! HTTP exposition router. Consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod cli;
pub mod config;
pub mod obs;
pub mod ops;
pub mod router;
pub mod sampler;
pub mod server;
pub mod source;
