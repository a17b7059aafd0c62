//! Sampler/publisher loop.
//!
//! Every `interval` the sampler asks the source for a fresh value of each
//! declared metric and overwrites it in the registry. Per-metric failures keep
//! the last good value and never stop the loop; only cancellation does.
//!
//! Lifecycle: `Running -> Stopped`, driven by a `CancellationToken`. A stopped
//! sampler is not restarted; build a new one (values start from zero).

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use jobgauge_core::error::{JobGaugeError, Result};
use jobgauge_core::metric::MetricDef;
use jobgauge_core::Registry;

use crate::obs::ExporterMetrics;
use crate::source::MetricSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Outcome of one tick.
#[derive(Debug, Default)]
pub struct TickReport {
    pub updated: Vec<&'static str>,
    pub clamped: Vec<&'static str>,
    pub failed: Vec<(&'static str, JobGaugeError)>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.clamped.is_empty()
    }
}

enum Published {
    Set,
    Clamped,
}

#[derive(Clone)]
pub struct Sampler {
    registry: Arc<Registry>,
    source: Arc<dyn MetricSource>,
    obs: Arc<ExporterMetrics>,
    sample_timeout: Duration,
}

impl Sampler {
    pub fn new(
        registry: Arc<Registry>,
        source: Arc<dyn MetricSource>,
        obs: Arc<ExporterMetrics>,
        sample_timeout: Duration,
    ) -> Self {
        Self { registry, source, obs, sample_timeout }
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Run one sampling pass. Never fails; problems land in the report.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        let defs: Vec<MetricDef> = self.registry.defs().copied().collect();

        let begun = match tokio::time::timeout(self.sample_timeout, self.source.begin_tick()).await {
            Ok(r) => r,
            Err(_) => Err(JobGaugeError::Timeout(format!("{} begin_tick", self.source.kind()))),
        };
        if let Err(e) = begun {
            tracing::warn!(source = self.source.kind(), error = %e, "tick skipped, keeping previous values");
            for def in &defs {
                self.obs.sample_errors.inc(&[("metric", def.name), ("reason", e.code().as_str())]);
            }
            report.failed = defs
                .iter()
                .map(|d| (d.name, e.clone()))
                .collect();
            self.obs.record_skipped_tick(unix_now());
            return report;
        }

        let results = join_all(defs.iter().map(|def| async move {
            let r = self.sample_one(def).await.and_then(|v| self.publish(def, v));
            (def.name, r)
        }))
        .await;

        for (name, r) in results {
            match r {
                Ok(Published::Set) => report.updated.push(name),
                Ok(Published::Clamped) => {
                    report.updated.push(name);
                    report.clamped.push(name);
                }
                Err(e) => {
                    tracing::warn!(metric = name, error = %e, "sample failed, keeping previous value");
                    self.obs.sample_errors.inc(&[("metric", name), ("reason", e.code().as_str())]);
                    report.failed.push((name, e));
                }
            }
        }

        self.obs.record_tick(unix_now());
        tracing::debug!(
            updated = report.updated.len(),
            failed = report.failed.len(),
            "tick complete"
        );
        report
    }

    async fn sample_one(&self, def: &MetricDef) -> Result<f64> {
        match tokio::time::timeout(self.sample_timeout, self.source.sample(def)).await {
            Ok(r) => r,
            Err(_) => Err(JobGaugeError::Timeout(def.name.to_string())),
        }
    }

    fn publish(&self, def: &MetricDef, value: f64) -> Result<Published> {
        if !value.is_finite() {
            return Err(JobGaugeError::InvalidMetricValue { metric: def.name.to_string(), value });
        }
        if def.non_negative && value < 0.0 {
            tracing::warn!(metric = def.name, value, "negative sample clamped to zero");
            self.obs.values_clamped.inc(&[("metric", def.name)]);
            self.registry.set(def.name, 0.0)?;
            return Ok(Published::Clamped);
        }
        self.registry.set(def.name, value)?;
        Ok(Published::Set)
    }

    /// Tick every `interval` until `cancel` fires. The first tick is immediate.
    pub async fn run(self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.obs.set_up(true);
        tracing::info!(interval_ms = interval.as_millis() as u64, source = self.source.kind(), "sampler running");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        self.obs.set_up(false);
        tracing::info!("sampler stopped");
    }

    /// Spawn `run` on the current runtime.
    pub fn spawn(self, interval: Duration) -> SamplerHandle {
        let cancel = CancellationToken::new();
        self.obs.set_up(true);
        let join = tokio::spawn(self.run(interval, cancel.clone()));
        SamplerHandle { cancel, join }
    }
}

/// Owner of a spawned sampler task.
pub struct SamplerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl SamplerHandle {
    pub fn state(&self) -> LoopState {
        if self.cancel.is_cancelled() || self.join.is_finished() {
            LoopState::Stopped
        } else {
            LoopState::Running
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel and wait for the task to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "sampler task ended abnormally");
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
