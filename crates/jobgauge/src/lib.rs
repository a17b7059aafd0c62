//! Top-level facade crate for jobgauge.
//!
//! Re-exports core types and the exporter library so users can depend on a single crate.

pub mod core {
    pub use jobgauge_core::*;
}

pub mod exporter {
    pub use jobgauge_exporter::*;
}
