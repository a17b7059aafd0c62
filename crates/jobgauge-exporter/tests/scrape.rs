#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use async_trait::async_trait;
use http_body_util::BodyExt;
use serde_json::json;
use tokio::net::TcpListener;
use tower::util::ServiceExt;

use jobgauge_core::error::{JobGaugeError, Result};
use jobgauge_core::metric::{
    declared, MetricDef, CLUSTER_UPTIME_SECONDS, JOB_DURATION_SECONDS, JOB_STARTED_TOTAL,
};
use jobgauge_exporter::app_state::AppState;
use jobgauge_exporter::config;
use jobgauge_exporter::router::build_router;
use jobgauge_exporter::sampler::Sampler;
use jobgauge_exporter::server;
use jobgauge_exporter::source::{FixtureSource, HttpSource, MetricSource};

async fn get_path(state: &AppState, path: &str) -> (StatusCode, String) {
    let resp = build_router(state.clone())
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn value_of(body: &str, name: &str) -> f64 {
    body.lines()
        .find_map(|l| l.strip_prefix(name).and_then(|rest| rest.strip_prefix(' ')))
        .unwrap_or_else(|| panic!("{name} missing from scrape:\n{body}"))
        .parse()
        .unwrap()
}

#[tokio::test]
async fn metrics_endpoint_serves_every_declared_gauge() {
    let state = AppState::new(None, declared()).unwrap();
    let resp = build_router(state.clone())
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "text/plain; version=0.0.4; charset=utf-8"
    );

    let body = String::from_utf8(resp.into_body().collect().await.unwrap().to_bytes().to_vec()).unwrap();
    for def in declared() {
        assert!(body.contains(&format!("# TYPE {} gauge\n", def.name)));
        // exposition default before the first tick
        assert_eq!(value_of(&body, def.name), 0.0);
    }
    assert!(body.contains("jobgauge_up 0\n"));
}

#[tokio::test]
async fn scrapes_between_ticks_are_identical() {
    let state = AppState::new(None, declared()).unwrap();
    let src = FixtureSource::new()
        .with_values(JOB_STARTED_TOTAL, &[10.0, 20.0])
        .with_values(JOB_DURATION_SECONDS, &[301.5]);
    let s = Sampler::new(state.registry(), Arc::new(src), state.obs(), Duration::from_millis(500));

    s.tick().await;
    let (_, first) = get_path(&state, "/metrics").await;
    let (_, second) = get_path(&state, "/metrics").await;
    assert_eq!(first, second);
    assert_eq!(value_of(&first, JOB_STARTED_TOTAL), 10.0);
    assert_eq!(value_of(&first, JOB_DURATION_SECONDS), 301.5);

    s.tick().await;
    let (_, third) = get_path(&state, "/metrics").await;
    assert_eq!(value_of(&third, JOB_STARTED_TOTAL), 20.0);
}

#[tokio::test]
async fn namespace_prefixes_scrape_output() {
    let state = AppState::new(Some("databricks"), declared()).unwrap();
    state.registry().set(CLUSTER_UPTIME_SECONDS, 86_350.0).unwrap();
    let (_, body) = get_path(&state, "/metrics").await;
    assert_eq!(value_of(&body, "databricks_cluster_uptime_seconds"), 86_350.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scrapes_see_previous_or_new_value() {
    const A: f64 = 1.5;
    const B: f64 = 2.5;
    let state = AppState::new(None, declared()).unwrap();
    let src = FixtureSource::new().with_values(JOB_STARTED_TOTAL, &[A, B]);
    let s = Sampler::new(state.registry(), Arc::new(src), state.obs(), Duration::from_millis(500));
    s.tick().await;

    let writer = tokio::spawn(async move {
        for _ in 0..200 {
            s.tick().await;
            tokio::task::yield_now().await;
        }
    });

    let mut readers = Vec::new();
    for _ in 0..4 {
        let state = state.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..100 {
                let (_, body) = get_path(&state, "/metrics").await;
                let v = value_of(&body, JOB_STARTED_TOTAL);
                assert!(v == A || v == B, "unexpected value {v}");
            }
        }));
    }

    for r in readers {
        r.await.unwrap();
    }
    writer.await.unwrap();
}

#[tokio::test]
async fn health_and_readiness() {
    let state = AppState::new(None, declared()).unwrap();
    assert_eq!(get_path(&state, "/healthz").await, (StatusCode::OK, "ok".to_string()));
    assert_eq!(
        get_path(&state, "/readyz").await,
        (StatusCode::SERVICE_UNAVAILABLE, "warming up".to_string())
    );

    state.obs().set_up(true);
    state.obs().record_tick(1);
    // a tick ran but nothing was published yet
    assert_eq!(
        get_path(&state, "/readyz").await,
        (StatusCode::SERVICE_UNAVAILABLE, "warming up".to_string())
    );

    state.registry().set(JOB_STARTED_TOTAL, 95.0).unwrap();
    assert_eq!(get_path(&state, "/readyz").await, (StatusCode::OK, "ready".to_string()));

    state.obs().set_up(false);
    assert_eq!(
        get_path(&state, "/readyz").await,
        (StatusCode::SERVICE_UNAVAILABLE, "stopped".to_string())
    );
}

/// Backend that never manages to start a tick.
struct Unreachable;

#[async_trait]
impl MetricSource for Unreachable {
    fn kind(&self) -> &'static str {
        "unreachable"
    }

    async fn begin_tick(&self) -> Result<()> {
        Err(JobGaugeError::SourceUnavailable("connection refused".into()))
    }

    async fn sample(&self, _metric: &MetricDef) -> Result<f64> {
        Ok(1.0)
    }
}

#[tokio::test]
async fn not_ready_while_first_ticks_are_skipped() {
    let state = AppState::new(None, declared()).unwrap();
    state.obs().set_up(true);
    let s = Sampler::new(state.registry(), Arc::new(Unreachable), state.obs(), Duration::from_millis(500));

    s.tick().await;
    s.tick().await;

    assert_eq!(state.obs().ticks_total(), 2);
    assert_eq!(state.obs().ticks_skipped_total(), 2);
    assert_eq!(
        get_path(&state, "/readyz").await,
        (StatusCode::SERVICE_UNAVAILABLE, "warming up".to_string())
    );
    let (_, body) = get_path(&state, "/metrics").await;
    assert_eq!(value_of(&body, "job_succeeded_total"), 0.0);
    assert_eq!(value_of(&body, "jobgauge_ticks_skipped_total"), 2.0);
}

async fn spawn_backend() -> String {
    let app = Router::new()
        .route(
            "/ok",
            get(|| async {
                Json(json!({
                    "job_started_total": 97,
                    "job_succeeded_total": 95,
                    "job_duration_seconds": 412.5,
                    "cluster_uptime_seconds": 86_380.25,
                    "cluster_cost_usd": 333.0,
                    "note": "ignored"
                }))
            }),
        )
        .route(
            "/huge",
            get(|| async { Json(json!({ "job_started_total": 1, "padding": "x".repeat(4096) })) }),
        )
        .route("/partial", get(|| async { Json(json!({ "job_started_total": 91 })) }))
        .route("/down", get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn http_source_publishes_backend_snapshot() {
    let base = spawn_backend().await;
    let state = AppState::new(None, declared()).unwrap();
    let timeout = Duration::from_secs(5);

    let ok = Sampler::new(state.registry(), Arc::new(HttpSource::new(&format!("{base}/ok")).unwrap()), state.obs(), timeout);
    let report = ok.tick().await;
    assert!(report.is_clean(), "{report:?}");
    let (_, body) = get_path(&state, "/metrics").await;
    assert_eq!(value_of(&body, "job_started_total"), 97.0);
    assert_eq!(value_of(&body, "job_succeeded_total"), 95.0);
    assert_eq!(value_of(&body, "cluster_uptime_seconds"), 86_380.25);

    // backend outage: every value stays put
    let down = Sampler::new(state.registry(), Arc::new(HttpSource::new(&format!("{base}/down")).unwrap()), state.obs(), timeout);
    let report = down.tick().await;
    assert_eq!(report.failed.len(), declared().len());
    let (_, after) = get_path(&state, "/metrics").await;
    assert_eq!(value_of(&after, "job_started_total"), 97.0);
    assert_eq!(value_of(&after, "cluster_cost_usd"), 333.0);

    // oversized snapshot is refused before parsing
    let huge = Sampler::new(
        state.registry(),
        Arc::new(HttpSource::new(&format!("{base}/huge")).unwrap().with_max_body(1024)),
        state.obs(),
        timeout,
    );
    let report = huge.tick().await;
    assert_eq!(report.failed.len(), declared().len());
    assert!(report.failed.iter().all(|(_, e)| matches!(e, JobGaugeError::SourceUnavailable(_))));
    assert_eq!(state.registry().get("job_started_total").unwrap(), 97.0);

    // partial snapshot: only the present key moves
    let partial = Sampler::new(state.registry(), Arc::new(HttpSource::new(&format!("{base}/partial")).unwrap()), state.obs(), timeout);
    let report = partial.tick().await;
    assert_eq!(report.updated, vec!["job_started_total"]);
    assert_eq!(state.registry().get("job_started_total").unwrap(), 91.0);
    assert_eq!(state.registry().get("job_succeeded_total").unwrap(), 95.0);
}

#[tokio::test]
async fn bind_conflict_is_fatal() {
    let held = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = held.local_addr().unwrap();
    let err = server::bind(addr).await.expect_err("port in use");
    assert_eq!(err.code().as_str(), "server_failure");
    assert!(err.is_fatal());
}

#[tokio::test]
async fn serve_until_shutdown() {
    let cfg = config::load_from_str(
        r#"
version: 1
exporter:
  listen: "127.0.0.1:0"
  interval_ms: 100
  sample_timeout_ms: 50
source:
  kind: fixture
  sequences:
    job_started_total: [100]
    job_succeeded_total: [98]
"#,
    )
    .unwrap();

    let listener = server::bind(cfg.exporter.listen_addr().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let task = tokio::spawn(server::serve(listener, cfg, async {
        let _ = rx.await;
    }));

    let url = format!("http://{addr}/metrics");
    let mut body = String::new();
    for _ in 0..50 {
        body = reqwest::get(&url).await.unwrap().text().await.unwrap();
        if value_of(&body, JOB_STARTED_TOTAL) > 0.0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(value_of(&body, JOB_STARTED_TOTAL), 100.0);
    assert_eq!(value_of(&body, "job_succeeded_total"), 98.0);

    tx.send(()).unwrap();
    task.await.unwrap().expect("clean shutdown");
}
