use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use jobgauge_core::error::{JobGaugeError, Result};
use jobgauge_core::metric::MetricDef;

use super::MetricSource;

/// Largest snapshot body accepted from the backend.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Pulls `{"<metric>": <number>, ...}` from a backend once per tick.
///
/// Non-numeric entries are ignored; a metric absent from the snapshot is
/// reported unavailable for that tick.
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
    max_body: usize,
    snapshot: Mutex<Option<HashMap<String, f64>>>,
}

impl HttpSource {
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| JobGaugeError::Internal(format!("http client build failed: {e}")))?;
        Ok(Self {
            client,
            url: url.to_string(),
            max_body: DEFAULT_MAX_BODY_BYTES,
            snapshot: Mutex::new(None),
        })
    }

    pub fn with_max_body(mut self, bytes: usize) -> Self {
        self.max_body = bytes;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<HashMap<String, f64>> {
        let mut resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| JobGaugeError::SourceUnavailable(format!("GET {} failed: {e}", self.url)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(JobGaugeError::SourceUnavailable(format!(
                "GET {} returned {status}",
                self.url
            )));
        }

        let too_large = || {
            JobGaugeError::SourceUnavailable(format!(
                "snapshot from {} exceeds {} bytes",
                self.url, self.max_body
            ))
        };
        if resp.content_length().is_some_and(|len| len > self.max_body as u64) {
            return Err(too_large());
        }

        // chunked bodies carry no content-length
        let mut body = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| JobGaugeError::SourceUnavailable(format!("read body failed: {e}")))?
        {
            if body.len() + chunk.len() > self.max_body {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        let raw: HashMap<String, serde_json::Value> = serde_json::from_slice(&body)
            .map_err(|e| JobGaugeError::SourceUnavailable(format!("malformed snapshot: {e}")))?;

        Ok(raw
            .into_iter()
            .filter_map(|(k, v)| v.as_f64().map(|n| (k, n)))
            .collect())
    }
}

#[async_trait]
impl MetricSource for HttpSource {
    fn kind(&self) -> &'static str {
        "http"
    }

    async fn begin_tick(&self) -> Result<()> {
        let fetched = self.fetch().await;
        let mut snap = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        match fetched {
            Ok(values) => {
                *snap = Some(values);
                Ok(())
            }
            Err(e) => {
                *snap = None;
                Err(e)
            }
        }
    }

    async fn sample(&self, metric: &MetricDef) -> Result<f64> {
        let snap = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        let values = snap
            .as_ref()
            .ok_or_else(|| JobGaugeError::SourceUnavailable("no backend snapshot".into()))?;
        values
            .get(metric.name)
            .copied()
            .ok_or_else(|| JobGaugeError::SourceUnavailable(format!("backend snapshot missing {}", metric.name)))
    }
}
