//! Exporter self-metrics.
//!
//! Counters with dynamic labels backed by `DashMap`. Labels are flattened into
//! sorted key vectors to keep deterministic ordering. Rendered after the
//! published gauges on every scrape.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut key: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<Vec<(String, String)>, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Current value for an exact label set (0 if never incremented).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, help: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} counter");
        let mut rows: Vec<(String, u64)> = self
            .map
            .iter()
            .map(|r| {
                let label_str = r
                    .key()
                    .iter()
                    .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
                    .collect::<Vec<_>>()
                    .join(",");
                (label_str, r.value().load(Ordering::Relaxed))
            })
            .collect();
        rows.sort();
        for (label_str, val) in rows {
            if label_str.is_empty() {
                let _ = writeln!(out, "{name} {val}");
            } else {
                let _ = writeln!(out, "{name}{{{label_str}}} {val}");
            }
        }
    }
}

#[derive(Default)]
pub struct ExporterMetrics {
    pub ticks: CounterVec,
    pub ticks_skipped: CounterVec,
    pub sample_errors: CounterVec,
    pub values_clamped: CounterVec,
    last_tick_secs: AtomicU64,
    up: AtomicBool,
}

impl ExporterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::Relaxed);
    }

    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Relaxed)
    }

    pub fn record_tick(&self, at_unix_secs: u64) {
        self.ticks.inc(&[]);
        self.last_tick_secs.store(at_unix_secs, Ordering::Relaxed);
    }

    /// A tick whose `begin_tick` failed: counted as attempted and skipped.
    pub fn record_skipped_tick(&self, at_unix_secs: u64) {
        self.record_tick(at_unix_secs);
        self.ticks_skipped.inc(&[]);
    }

    pub fn ticks_total(&self) -> u64 {
        self.ticks.get(&[])
    }

    pub fn ticks_skipped_total(&self) -> u64 {
        self.ticks_skipped.get(&[])
    }

    pub fn last_tick_secs(&self) -> u64 {
        self.last_tick_secs.load(Ordering::Relaxed)
    }

    pub fn render_into(&self, out: &mut String) {
        self.ticks.render("jobgauge_ticks_total", "Sampling ticks attempted", out);
        self.ticks_skipped.render(
            "jobgauge_ticks_skipped_total",
            "Sampling ticks skipped because the source could not start a tick",
            out,
        );
        self.sample_errors.render(
            "jobgauge_sample_errors_total",
            "Samples that failed and kept their previous value",
            out,
        );
        self.values_clamped.render(
            "jobgauge_values_clamped_total",
            "Negative samples clamped to zero",
            out,
        );
        let _ = writeln!(
            out,
            "# HELP jobgauge_last_tick_timestamp_seconds Unix time of the last attempted tick\n\
             # TYPE jobgauge_last_tick_timestamp_seconds gauge\n\
             jobgauge_last_tick_timestamp_seconds {}",
            self.last_tick_secs()
        );
        let _ = writeln!(
            out,
            "# HELP jobgauge_up Whether the sampler is running\n\
             # TYPE jobgauge_up gauge\n\
             jobgauge_up {}",
            if self.is_up() { 1 } else { 0 }
        );
    }
}
