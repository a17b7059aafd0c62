//! Shared error type across jobgauge crates.

use thiserror::Error;

/// Stable error codes (used in logs and self-metrics labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Data source could not be reached.
    SourceUnavailable,
    /// Data source call exceeded its deadline.
    Timeout,
    /// Data source returned a value that cannot be published.
    InvalidValue,
    /// Metric name not declared in the registry.
    UnknownMetric,
    /// Configuration rejected.
    BadConfig,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Exposition listener could not be started.
    ServerFailure,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// Snake-case form, suitable for a metric label value.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::SourceUnavailable => "source_unavailable",
            ErrorCode::Timeout => "timeout",
            ErrorCode::InvalidValue => "invalid_value",
            ErrorCode::UnknownMetric => "unknown_metric",
            ErrorCode::BadConfig => "bad_config",
            ErrorCode::UnsupportedVersion => "unsupported_version",
            ErrorCode::ServerFailure => "server_failure",
            ErrorCode::Internal => "internal",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, JobGaugeError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Clone, Error)]
pub enum JobGaugeError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("sample timed out: {0}")]
    Timeout(String),
    #[error("invalid value for {metric}: {value}")]
    InvalidMetricValue { metric: String, value: f64 },
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version: {0}")]
    UnsupportedVersion(u32),
    #[error("exposition server failure: {0}")]
    ExpositionServerFailure(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl JobGaugeError {
    /// Map to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            JobGaugeError::SourceUnavailable(_) => ErrorCode::SourceUnavailable,
            JobGaugeError::Timeout(_) => ErrorCode::Timeout,
            JobGaugeError::InvalidMetricValue { .. } => ErrorCode::InvalidValue,
            JobGaugeError::UnknownMetric(_) => ErrorCode::UnknownMetric,
            JobGaugeError::BadConfig(_) => ErrorCode::BadConfig,
            JobGaugeError::UnsupportedVersion(_) => ErrorCode::UnsupportedVersion,
            JobGaugeError::ExpositionServerFailure(_) => ErrorCode::ServerFailure,
            JobGaugeError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Startup-time errors terminate the process; per-tick errors never do.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            JobGaugeError::BadConfig(_)
                | JobGaugeError::UnsupportedVersion(_)
                | JobGaugeError::ExpositionServerFailure(_)
        )
    }
}
