//! Command-line flags. Each flag can also come from the environment.
//!
//! Precedence: defaults < YAML file < flags/env.

use clap::Parser;

use jobgauge_core::error::Result;

use crate::config::{self, ExporterConfig};

#[derive(Debug, Default, Parser)]
#[command(name = "jobgauge-exporter")]
#[command(about = "Publishes job and cluster gauges for Prometheus scraping")]
#[command(version)]
pub struct Cli {
    /// Path to a YAML config file (defaults apply when omitted)
    #[arg(short = 'c', long = "config", env = "JOBGAUGE_CONFIG")]
    pub config: Option<String>,

    /// Listen address for the metrics endpoint, e.g. 0.0.0.0:9100
    #[arg(long, env = "JOBGAUGE_LISTEN")]
    pub listen: Option<String>,

    /// Sampling interval in milliseconds
    #[arg(long, env = "JOBGAUGE_INTERVAL_MS")]
    pub interval_ms: Option<u64>,

    /// Prefix prepended to every exposed metric name
    #[arg(long, env = "JOBGAUGE_NAMESPACE")]
    pub namespace: Option<String>,
}

impl Cli {
    /// Load the file (if any), apply overrides, validate the result.
    pub fn resolve_config(&self) -> Result<ExporterConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_from_file(path)?,
            None => ExporterConfig::default(),
        };
        self.apply_overrides(&mut cfg);
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_overrides(&self, cfg: &mut ExporterConfig) {
        if let Some(listen) = &self.listen {
            cfg.exporter.listen = listen.clone();
        }
        if let Some(ms) = self.interval_ms {
            cfg.exporter.interval_ms = ms;
            // a timeout that no longer fits is clamped to half the new interval
            if cfg.exporter.sample_timeout_ms >= ms {
                cfg.exporter.sample_timeout_ms = (ms / 2).max(1);
            }
        }
        if let Some(ns) = &self.namespace {
            cfg.exporter.namespace = Some(ns.clone());
        }
    }
}
