//! Shared application state for the exporter.
//!
//! The registry and self-metrics are owned here and handed explicitly to the
//! sampler and the router, so several isolated instances can coexist (tests).

use std::sync::Arc;

use jobgauge_core::error::Result;
use jobgauge_core::metric::MetricDef;
use jobgauge_core::Registry;

use crate::obs::ExporterMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Sampler running, at least one value published.
    Ready,
    /// Nothing published yet; every gauge still holds its default.
    WarmingUp,
    /// Sampler stopped.
    Stopped,
}

#[derive(Clone)]
pub struct AppState {
    registry: Arc<Registry>,
    obs: Arc<ExporterMetrics>,
}

impl AppState {
    pub fn new(namespace: Option<&str>, defs: &[MetricDef]) -> Result<Self> {
        Ok(Self {
            registry: Arc::new(Registry::new(namespace, defs)?),
            obs: Arc::new(ExporterMetrics::new()),
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn obs(&self) -> Arc<ExporterMetrics> {
        Arc::clone(&self.obs)
    }

    /// True once any gauge has been set by a tick.
    pub fn has_published(&self) -> bool {
        self.registry.snapshot().iter().any(|s| s.updated_at.is_some())
    }

    pub fn readiness(&self) -> Readiness {
        if !self.obs.is_up() && self.obs.ticks_total() > 0 {
            return Readiness::Stopped;
        }
        if self.obs.is_up() && self.has_published() {
            Readiness::Ready
        } else {
            Readiness::WarmingUp
        }
    }

    /// Full scrape body: published gauges, then exporter self-metrics.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.registry.render_into(&mut out);
        self.obs.render_into(&mut out);
        out
    }
}
