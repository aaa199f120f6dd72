// src/api.rs
//! HTTP face of the content service: the `getContent` message boundary plus
//! health and metrics.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;

use crate::content::{ContentRequest, ContentResponse, ContentService};

#[derive(Clone)]
pub struct AppState {
    pub content: Arc<ContentService>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(content: Arc<ContentService>) -> Self {
        Self {
            content,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/message", post(message))
        .route("/metrics", get(render_metrics))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn message(
    State(state): State<AppState>,
    Json(req): Json<ContentRequest>,
) -> Result<Json<ContentResponse>, (StatusCode, String)> {
    match state.content.handle(&req).await {
        Some(resp) => {
            tracing::debug!(target: "adlapse::api", kind = resp.content.kind(), "content served");
            Ok(Json(resp))
        }
        None => Err((
            StatusCode::BAD_REQUEST,
            format!("unsupported action: {}", req.action),
        )),
    }
}

async fn render_metrics(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .ok_or(StatusCode::NOT_FOUND)
}
