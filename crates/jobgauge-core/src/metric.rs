//! Metric definitions.
//!
//! The declared set is fixed at compile time. Names follow the Prometheus
//! naming rules and carry the unit as a suffix where one exists.

/// Metric type. Only gauges are exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
        }
    }
}

/// Immutable description of one exported metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDef {
    pub name: &'static str,
    pub kind: MetricKind,
    pub help: &'static str,
    pub unit: &'static str,
    /// Negative samples are clamped to zero.
    pub non_negative: bool,
}

impl MetricDef {
    pub const fn gauge(name: &'static str, unit: &'static str, help: &'static str) -> Self {
        Self { name, kind: MetricKind::Gauge, help, unit, non_negative: true }
    }
}

pub const JOB_SUCCEEDED_TOTAL: &str = "job_succeeded_total";
pub const JOB_STARTED_TOTAL: &str = "job_started_total";
pub const JOB_DURATION_SECONDS: &str = "job_duration_seconds";
pub const CLUSTER_UPTIME_SECONDS: &str = "cluster_uptime_seconds";
pub const CLUSTER_COST_USD: &str = "cluster_cost_usd";

/// The five gauges published on every tick.
pub const DECLARED: [MetricDef; 5] = [
    MetricDef::gauge(JOB_SUCCEEDED_TOTAL, "count", "Jobs completed successfully in the sampling window"),
    MetricDef::gauge(JOB_STARTED_TOTAL, "count", "Jobs started in the sampling window"),
    MetricDef::gauge(JOB_DURATION_SECONDS, "seconds", "Representative job execution time (seconds)"),
    MetricDef::gauge(CLUSTER_UPTIME_SECONDS, "seconds", "Cluster uptime (seconds)"),
    MetricDef::gauge(CLUSTER_COST_USD, "USD", "Estimated daily cluster cost (USD)"),
];

/// Returns the declared metric set.
pub fn declared() -> &'static [MetricDef] {
    &DECLARED
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
