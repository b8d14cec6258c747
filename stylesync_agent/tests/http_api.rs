//! Router-level tests for the one-shot endpoints, driven through `oneshot`.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tokio::sync::watch;
use tower::ServiceExt;

use common::{fixed_disk, fixed_memory, fixed_network, parse_ts, StepProbe};
use stylesync_agent::config::CorsPolicy;
use stylesync_agent::error::{CollectionError, ProcessError};
use stylesync_agent::http::build_router;
use stylesync_agent::processes::ProcessTable;
use stylesync_agent::sampler::{Sampler, SamplerSettings};
use stylesync_agent::session::StreamSettings;
use stylesync_agent::state::AppState;
use stylesync_agent::types::{MetricsSnapshot, ProcessInfo, ProcessState};

struct TwoProcesses;

impl ProcessTable for TwoProcesses {
    fn refresh(&mut self) -> Result<Vec<u32>, CollectionError> {
        Ok(vec![1, 2, 3])
    }
    fn inspect(&self, pid: u32) -> Result<ProcessInfo, ProcessError> {
        if pid == 2 {
            return Err(ProcessError::AccessDenied(pid));
        }
        Ok(ProcessInfo {
            pid,
            name: format!("svc{pid}"),
            status: ProcessState::Running,
            cpu_percent: 1.5,
            memory_percent: 0.5,
        })
    }
}

fn app_with(probe: Arc<StepProbe>, cors: &CorsPolicy) -> Router {
    let (_tx, rx) = watch::channel(false);
    let sampler = Sampler::new(probe, SamplerSettings::default());
    let state = AppState::new(sampler, Box::new(TwoProcesses), StreamSettings::default(), rx);
    build_router(state, cors)
}

fn app() -> (Router, Arc<StepProbe>) {
    let probe = Arc::new(StepProbe::new());
    (app_with(probe.clone(), &CorsPolicy::AllowAll), probe)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn root_returns_welcome_message() {
    let (app, _) = app();
    let resp = app.oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v: serde_json::Value = body_json(resp).await;
    assert_eq!(v["message"], "Welcome to StyleSync API");
}

#[tokio::test]
async fn metrics_returns_probe_readings() {
    let (app, _) = app();
    let resp = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let snap: MetricsSnapshot = body_json(resp).await;
    assert_eq!(snap.cpu_percent, 33.0);
    assert_eq!(snap.memory, fixed_memory());
    assert_eq!(snap.disk, fixed_disk());
    assert_eq!(snap.network, fixed_network());
}

#[tokio::test]
async fn consecutive_metrics_have_non_decreasing_timestamps() {
    let (app, _) = app();
    let first: MetricsSnapshot = body_json(app.clone().oneshot(get("/metrics")).await.unwrap()).await;
    let second: MetricsSnapshot = body_json(app.oneshot(get("/metrics")).await.unwrap()).await;
    assert!(parse_ts(&second.timestamp) >= parse_ts(&first.timestamp));
}

#[tokio::test]
async fn collection_error_is_a_server_error() {
    let (app, probe) = app();
    probe.fail_memory.store(true, Ordering::SeqCst);
    let resp = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let v: serde_json::Value = body_json(resp).await;
    assert!(v["detail"].as_str().unwrap().contains("memory"));
}

#[tokio::test]
async fn services_skips_inaccessible_processes() {
    let (app, _) = app();
    let resp = app.oneshot(get("/services")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let list: Vec<ProcessInfo> = body_json(resp).await;
    let pids: Vec<u32> = list.iter().map(|p| p.pid).collect();
    assert_eq!(pids, vec![1, 3]);
    assert_eq!(list[0].status, ProcessState::Running);
}

#[tokio::test]
async fn bearer_token_is_not_enforced() {
    let (app, _) = app();
    let req = Request::builder()
        .uri("/")
        .header(header::AUTHORIZATION, "Bearer wrong-token")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn default_cors_allows_any_origin() {
    let (app, _) = app();
    let req = Request::builder()
        .uri("/")
        .header(header::ORIGIN, "http://dashboard.example")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(
        resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}

#[tokio::test]
async fn restricted_cors_only_echoes_listed_origins() {
    let cors = CorsPolicy::parse(&["http://good.example".to_string()]).unwrap();
    let app = app_with(Arc::new(StepProbe::new()), &cors);

    let good = Request::builder()
        .uri("/")
        .header(header::ORIGIN, "http://good.example")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(good).await.unwrap();
    assert_eq!(
        resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://good.example"
    );

    let bad = Request::builder()
        .uri("/")
        .header(header::ORIGIN, "http://evil.example")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(bad).await.unwrap();
    assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn stream_endpoint_requires_upgrade() {
    let (app, _) = app();
    let resp = app.oneshot(get("/ws/metrics")).await.unwrap();
    assert!(resp.status().is_client_error());
}
