//! jobgauge exporter
//!
//! - `/metrics`: job and cluster gauges in Prometheus text format
//! - Background sampler refreshes every gauge once per interval
//! - Config: YAML file, overridable by flags / env

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobgauge_exporter::{cli::Cli, server};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let cfg = match cli.resolve_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "config load failed");
            return ExitCode::FAILURE;
        }
    };

    match server::run(cfg, server::shutdown_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, fatal = e.is_fatal(), "exporter failed");
            ExitCode::FAILURE
        }
    }
}
