use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use jobgauge_core::error::{JobGaugeError, Result};
use jobgauge_core::metric::MetricDef;

use super::MetricSource;

/// Replays recorded values. Tick `n` (0-based) reads step `n % len` of each
/// metric's sequence; a `None` step reports the source as unavailable.
#[derive(Default)]
pub struct FixtureSource {
    sequences: HashMap<String, Vec<Option<f64>>>,
    ticks: AtomicU64,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sequence(mut self, metric: &str, steps: Vec<Option<f64>>) -> Self {
        self.sequences.insert(metric.to_string(), steps);
        self
    }

    /// Convenience for sequences with no failing steps.
    pub fn with_values(self, metric: &str, values: &[f64]) -> Self {
        self.with_sequence(metric, values.iter().copied().map(Some).collect())
    }

    /// Number of ticks started so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }
}

#[async_trait]
impl MetricSource for FixtureSource {
    fn kind(&self) -> &'static str {
        "fixture"
    }

    async fn begin_tick(&self) -> Result<()> {
        self.ticks.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn sample(&self, metric: &MetricDef) -> Result<f64> {
        let steps = self
            .sequences
            .get(metric.name)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| JobGaugeError::SourceUnavailable(format!("no fixture for {}", metric.name)))?;

        let tick = self.ticks().saturating_sub(1);
        let step = (tick % steps.len() as u64) as usize;
        steps[step].ok_or_else(|| {
            JobGaugeError::SourceUnavailable(format!("fixture step {step} of {} is a gap", metric.name))
        })
    }
}
