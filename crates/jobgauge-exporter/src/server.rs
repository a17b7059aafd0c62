//! Process wiring: bind, spawn the sampler, serve until shutdown.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;

use jobgauge_core::error::{JobGaugeError, Result};
use jobgauge_core::metric::declared;

use crate::app_state::AppState;
use crate::config::ExporterConfig;
use crate::router::build_router;
use crate::sampler::Sampler;
use crate::source::build_source;

/// Bind the exposition listener. Failure here is fatal.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| JobGaugeError::ExpositionServerFailure(format!("bind {addr} failed: {e}")))
}

/// Bind `cfg.exporter.listen` and serve until `shutdown` resolves.
pub async fn run<F>(cfg: ExporterConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = bind(cfg.exporter.listen_addr()?).await?;
    serve(listener, cfg, shutdown).await
}

/// Serve on an already-bound listener. The sampler is stopped before returning.
pub async fn serve<F>(listener: TcpListener, cfg: ExporterConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState::new(cfg.exporter.namespace.as_deref(), declared())?;
    let source = build_source(&cfg.source)?;

    let local = listener
        .local_addr()
        .map_err(|e| JobGaugeError::ExpositionServerFailure(e.to_string()))?;
    tracing::info!(
        listen = %local,
        interval_ms = cfg.exporter.interval_ms,
        source = source.kind(),
        "jobgauge-exporter starting"
    );

    let sampler = Sampler::new(state.registry(), source, state.obs(), cfg.exporter.sample_timeout());
    let handle = sampler.spawn(cfg.exporter.interval());

    let app = build_router(state);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| JobGaugeError::ExpositionServerFailure(format!("server failed: {e}")));

    handle.stop().await;
    tracing::info!("jobgauge-exporter stopped");
    served
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
