//! Route table and the one-shot handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::CorsPolicy;
use crate::error::CollectionError;
use crate::processes::list_processes;
use crate::state::AppState;
use crate::types::{MetricsSnapshot, ProcessInfo, RootInfo};
use crate::ws::ws_handler;

pub fn build_router(state: AppState, cors: &CorsPolicy) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/metrics", get(metrics))
        .route("/services", get(services))
        .route("/ws/metrics", get(ws_handler))
        .layer(cors.layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any collection failure maps to a generic 500.
#[derive(Debug)]
pub struct ApiError(CollectionError);

impl From<CollectionError> for ApiError {
    fn from(e: CollectionError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "metrics collection failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.0.to_string() })),
        )
            .into_response()
    }
}

async fn root() -> Json<RootInfo> {
    Json(RootInfo {
        message: "Welcome to StyleSync API".into(),
    })
}

async fn metrics(State(state): State<AppState>) -> Result<Json<MetricsSnapshot>, ApiError> {
    Ok(Json(state.sampler.sample().await?))
}

async fn services(State(state): State<AppState>) -> Result<Json<Vec<ProcessInfo>>, ApiError> {
    let table = state.processes.clone();
    let list = tokio::task::spawn_blocking(move || {
        let mut table = table.blocking_lock();
        list_processes(&mut **table)
    })
    .await
    .map_err(|e| CollectionError::Aborted(e.to_string()))??;
    Ok(Json(list))
}
