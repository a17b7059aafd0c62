//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/readyz`  : readiness (503 before the first tick and after stop)
//! - `/metrics` : Prometheus text format

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::app_state::{AppState, Readiness};

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    match state.readiness() {
        Readiness::Ready => (StatusCode::OK, "ready"),
        Readiness::WarmingUp => (StatusCode::SERVICE_UNAVAILABLE, "warming up"),
        Readiness::Stopped => (StatusCode::SERVICE_UNAVAILABLE, "stopped"),
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.render(),
    )
        .into_response()
}
