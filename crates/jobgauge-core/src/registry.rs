//! Gauge registry and text exposition.
//!
//! Each gauge stores its `f64` as raw bits in an `AtomicU64`, so a write is a
//! single store and a scrape is a single load. Readers therefore see either the
//! previous or the new value of a metric, never a torn one. There is no
//! cross-metric snapshot: two gauges read in one scrape may come from
//! different ticks.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{JobGaugeError, Result};
use crate::metric::{is_valid_name, MetricDef};

/// Helper to escape HELP text.
fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A single lock-free float gauge.
#[derive(Debug, Default)]
pub struct Gauge {
    bits: AtomicU64,
    // unix seconds of the last set; 0 = never set
    updated_at: AtomicU64,
}

impl Gauge {
    pub fn set(&self, v: f64) {
        self.bits.store(v.to_bits(), Ordering::Release);
        self.updated_at.store(unix_now().max(1), Ordering::Release);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    pub fn updated_at(&self) -> Option<u64> {
        match self.updated_at.load(Ordering::Acquire) {
            0 => None,
            t => Some(t),
        }
    }
}

/// Point-in-time read of one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: &'static str,
    pub value: f64,
    pub updated_at: Option<u64>,
}

struct Entry {
    def: MetricDef,
    exposed: String,
    gauge: Gauge,
}

/// Fixed set of gauges, shared by the sampler (writer) and scrapes (readers).
pub struct Registry {
    namespace: Option<String>,
    entries: Vec<Entry>,
    index: HashMap<&'static str, usize>,
}

impl Registry {
    /// Build a registry over `defs`. Names must be valid and unique.
    pub fn new(namespace: Option<&str>, defs: &[MetricDef]) -> Result<Self> {
        let namespace = match namespace {
            Some(ns) if !ns.is_empty() => {
                if !is_valid_name(ns) {
                    return Err(JobGaugeError::BadConfig(format!("invalid namespace: {ns}")));
                }
                Some(ns.to_string())
            }
            _ => None,
        };

        let mut entries = Vec::with_capacity(defs.len());
        let mut index = HashMap::with_capacity(defs.len());
        for def in defs {
            if !is_valid_name(def.name) {
                return Err(JobGaugeError::BadConfig(format!("invalid metric name: {}", def.name)));
            }
            if index.insert(def.name, entries.len()).is_some() {
                return Err(JobGaugeError::BadConfig(format!("duplicate metric: {}", def.name)));
            }
            let exposed = match &namespace {
                Some(ns) => format!("{ns}_{}", def.name),
                None => def.name.to_string(),
            };
            entries.push(Entry { def: *def, exposed, gauge: Gauge::default() });
        }

        Ok(Self { namespace, entries, index })
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Declared definitions, in registration order.
    pub fn defs(&self) -> impl Iterator<Item = &MetricDef> {
        self.entries.iter().map(|e| &e.def)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, name: &str) -> Result<&Entry> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| JobGaugeError::UnknownMetric(name.to_string()))
    }

    /// Overwrite the current value. Non-finite values are rejected.
    pub fn set(&self, name: &str, value: f64) -> Result<()> {
        let entry = self.entry(name)?;
        if !value.is_finite() {
            return Err(JobGaugeError::InvalidMetricValue { metric: name.to_string(), value });
        }
        entry.gauge.set(value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<f64> {
        Ok(self.entry(name)?.gauge.get())
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.entries
            .iter()
            .map(|e| Sample {
                name: e.def.name,
                value: e.gauge.get(),
                updated_at: e.gauge.updated_at(),
            })
            .collect()
    }

    /// Render in Prometheus text exposition format.
    pub fn render_into(&self, out: &mut String) {
        for e in &self.entries {
            let _ = writeln!(out, "# HELP {} {}", e.exposed, escape_help(e.def.help));
            let _ = writeln!(out, "# TYPE {} {}", e.exposed, e.def.kind.as_str());
            let _ = writeln!(out, "{} {}", e.exposed, e.gauge.get());
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }
}
