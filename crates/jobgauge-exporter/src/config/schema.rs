use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use jobgauge_core::error::{JobGaugeError, Result};
use jobgauge_core::metric::{declared, is_valid_name};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub exporter: ExporterSection,

    #[serde(default)]
    pub source: SourceConfig,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            exporter: ExporterSection::default(),
            source: SourceConfig::default(),
        }
    }
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(JobGaugeError::UnsupportedVersion(self.version));
        }

        self.exporter.validate()?;
        self.source.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_sample_timeout_ms")]
    pub sample_timeout_ms: u64,

    #[serde(default)]
    pub namespace: Option<String>,
}

impl Default for ExporterSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            interval_ms: default_interval_ms(),
            sample_timeout_ms: default_sample_timeout_ms(),
            namespace: None,
        }
    }
}

impl ExporterSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !(100..=3_600_000).contains(&self.interval_ms) {
            return Err(JobGaugeError::BadConfig(
                "exporter.interval_ms must be between 100 and 3600000".into(),
            ));
        }
        if self.sample_timeout_ms == 0 || self.sample_timeout_ms >= self.interval_ms {
            return Err(JobGaugeError::BadConfig(
                "exporter.sample_timeout_ms must be positive and less than interval_ms".into(),
            ));
        }
        if let Some(ns) = &self.namespace {
            if !is_valid_name(ns) {
                return Err(JobGaugeError::BadConfig(format!(
                    "exporter.namespace is not a valid metric name prefix: {ns}"
                )));
            }
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            JobGaugeError::BadConfig(format!("exporter.listen must be a valid SocketAddr: {e}"))
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms)
    }
}

fn default_listen() -> String {
    "0.0.0.0:9100".into()
}
fn default_interval_ms() -> u64 {
    15000
}
fn default_sample_timeout_ms() -> u64 {
    5000
}

/// Which data source feeds the sampler.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum SourceConfig {
    #[default]
    Random,
    /// Recorded per-metric sequences, cycled forever. `null` steps fail.
    Fixture {
        #[serde(default)]
        sequences: BTreeMap<String, Vec<Option<f64>>>,
    },
    /// JSON snapshot fetched from a backend once per tick.
    Http { url: String },
}

impl SourceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::Random => "random",
            SourceConfig::Fixture { .. } => "fixture",
            SourceConfig::Http { .. } => "http",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            SourceConfig::Random => Ok(()),
            SourceConfig::Fixture { sequences } => {
                for (name, steps) in sequences {
                    if !declared().iter().any(|d| d.name == name) {
                        return Err(JobGaugeError::BadConfig(format!(
                            "source.sequences refers to undeclared metric: {name}"
                        )));
                    }
                    if steps.is_empty() {
                        return Err(JobGaugeError::BadConfig(format!(
                            "source.sequences.{name} must not be empty"
                        )));
                    }
                }
                Ok(())
            }
            SourceConfig::Http { url } => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(JobGaugeError::BadConfig(
                        "source.url must be an http(s) URL".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}
