use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::Rng;

use jobgauge_core::error::{JobGaugeError, Result};
use jobgauge_core::metric::{
    MetricDef, CLUSTER_COST_USD, CLUSTER_UPTIME_SECONDS, JOB_DURATION_SECONDS, JOB_STARTED_TOTAL,
    JOB_SUCCEEDED_TOTAL,
};

use super::MetricSource;

const DAY_SECONDS: f64 = 86_400.0;

/// Draws one coherent set of values per tick.
///
/// Job counts are drawn together so that `succeeded <= started` always holds.
#[derive(Default)]
pub struct RandomSource {
    current: Mutex<Option<HashMap<&'static str, f64>>>,
}

impl RandomSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn draw() -> HashMap<&'static str, f64> {
        let mut rng = rand::rng();
        let started: u32 = rng.random_range(90..=100);
        let succeeded = started - rng.random_range(0..=2);

        HashMap::from([
            (JOB_STARTED_TOTAL, f64::from(started)),
            (JOB_SUCCEEDED_TOTAL, f64::from(succeeded)),
            (JOB_DURATION_SECONDS, rng.random_range(300.0..900.0)),
            (CLUSTER_UPTIME_SECONDS, DAY_SECONDS - rng.random_range(0.0..100.0)),
            (CLUSTER_COST_USD, rng.random_range(300.0..450.0)),
        ])
    }
}

#[async_trait]
impl MetricSource for RandomSource {
    fn kind(&self) -> &'static str {
        "random"
    }

    async fn begin_tick(&self) -> Result<()> {
        let mut cur = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *cur = Some(Self::draw());
        Ok(())
    }

    async fn sample(&self, metric: &MetricDef) -> Result<f64> {
        let mut cur = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let snapshot = cur.get_or_insert_with(Self::draw);
        snapshot
            .get(metric.name)
            .copied()
            .ok_or_else(|| JobGaugeError::SourceUnavailable(format!("random source has no {}", metric.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobgauge_core::metric::declared;

    fn def(name: &str) -> &'static MetricDef {
        declared().iter().find(|d| d.name == name).expect("declared")
    }

    #[tokio::test]
    async fn values_stay_in_range() {
        let src = RandomSource::new();
        for _ in 0..200 {
            src.begin_tick().await.expect("begin");
            let started = src.sample(def(JOB_STARTED_TOTAL)).await.expect("started");
            let succeeded = src.sample(def(JOB_SUCCEEDED_TOTAL)).await.expect("succeeded");
            assert!((90.0..=100.0).contains(&started));
            assert!(succeeded <= started && succeeded >= started - 2.0);

            let duration = src.sample(def(JOB_DURATION_SECONDS)).await.expect("duration");
            assert!((300.0..900.0).contains(&duration));
            let uptime = src.sample(def(CLUSTER_UPTIME_SECONDS)).await.expect("uptime");
            assert!(uptime > DAY_SECONDS - 100.0 && uptime <= DAY_SECONDS);
            let cost = src.sample(def(CLUSTER_COST_USD)).await.expect("cost");
            assert!((300.0..450.0).contains(&cost));
        }
    }

    #[tokio::test]
    async fn unknown_metric_is_unavailable() {
        let src = RandomSource::new();
        let other = MetricDef::gauge("other_total", "count", "other");
        let err = src.sample(&other).await.expect_err("not drawn");
        assert!(matches!(err, JobGaugeError::SourceUnavailable(_)));
    }
}
