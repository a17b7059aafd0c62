//! Pluggable metric sources.
//!
//! The sampler only talks to `MetricSource`. Concrete sources:
//! - `RandomSource`: stand-in that draws plausible values every tick
//! - `FixtureSource`: recorded sequences, for deterministic runs
//! - `HttpSource`: JSON snapshot pulled from a real backend

mod fixture;
mod http;
mod random;

use std::sync::Arc;

use async_trait::async_trait;

use jobgauge_core::error::Result;
use jobgauge_core::metric::MetricDef;

use crate::config::SourceConfig;

pub use fixture::FixtureSource;
pub use http::{HttpSource, DEFAULT_MAX_BODY_BYTES};
pub use random::RandomSource;

#[async_trait]
pub trait MetricSource: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Called once at the start of every tick, before any `sample`.
    /// An error skips the whole tick.
    async fn begin_tick(&self) -> Result<()> {
        Ok(())
    }

    /// Current value of `metric`. Fails with `SourceUnavailable` when the
    /// backend cannot provide it.
    async fn sample(&self, metric: &MetricDef) -> Result<f64>;
}

/// Build the source selected in config.
pub fn build_source(cfg: &SourceConfig) -> Result<Arc<dyn MetricSource>> {
    Ok(match cfg {
        SourceConfig::Random => Arc::new(RandomSource::new()),
        SourceConfig::Fixture { sequences } => {
            let mut src = FixtureSource::new();
            for (name, steps) in sequences {
                src = src.with_sequence(name, steps.clone());
            }
            Arc::new(src)
        }
        SourceConfig::Http { url } => Arc::new(HttpSource::new(url)?),
    })
}
