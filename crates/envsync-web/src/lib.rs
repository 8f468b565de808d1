//! JSON trigger surface for envelope sync runs.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use envsync_core::SyncMode;
use envsync_sync::{orchestrator_from_env, SyncConfig, SyncOrchestrator, SyncRejected};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const CRATE_NAME: &str = "envsync-web";

const DEFAULT_STATUS_LIMIT: i64 = 10;
const MAX_STATUS_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SyncOrchestrator>,
    /// Passed to every triggered run; cancelled on shutdown.
    pub cancel: CancellationToken,
}

impl AppState {
    pub fn new(orchestrator: Arc<SyncOrchestrator>, cancel: CancellationToken) -> Self {
        Self { orchestrator, cancel }
    }
}

/// Body of `POST /sync/envelopes`: `{}`, `{"days_back": n}` or `{"force_full_sync": true}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub days_back: Option<u32>,
    #[serde(default)]
    pub force_full_sync: bool,
}

impl SyncRequest {
    pub fn parse(body: &[u8]) -> Result<Self, String> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|err| err.to_string())
    }

    pub fn mode(&self) -> Result<SyncMode, String> {
        match (self.days_back, self.force_full_sync) {
            (Some(_), true) => Err("days_back and force_full_sync cannot be combined".to_string()),
            (Some(0), false) => Err("days_back must be at least 1".to_string()),
            (Some(days), false) => Ok(SyncMode::DaysBack(days)),
            (None, true) => Ok(SyncMode::ForceFull),
            (None, false) => Ok(SyncMode::Incremental),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
    limit: Option<i64>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/sync/envelopes", post(trigger_sync_handler))
        .route("/sync/status", get(sync_status_handler))
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("binding trigger surface on port {port}"))?;
    info!(port, "sync trigger surface listening");
    let shutdown = state.cancel.clone();
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

pub fn web_port_from_env() -> u16 {
    std::env::var("ENVSYNC_WEB_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000)
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    let config = SyncConfig::from_env();
    let orchestrator = Arc::new(orchestrator_from_env(&config).await?);
    serve(AppState::new(orchestrator, CancellationToken::new()), web_port_from_env()).await
}

async fn trigger_sync_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let mode = match SyncRequest::parse(&body).and_then(|request| request.mode()) {
        Ok(mode) => mode,
        Err(detail) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": "invalid sync request", "detail": detail })),
            )
                .into_response()
        }
    };

    // The run lives on its own task so a dropped request cannot strand the lock.
    match state.orchestrator.spawn_run(mode, state.cancel.clone()).await {
        Ok(Ok(report)) => (StatusCode::OK, Json(report)).into_response(),
        Ok(Err(SyncRejected::AlreadyRunning { current })) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "sync already in progress", "lock": current })),
        )
            .into_response(),
        Ok(Err(err @ SyncRejected::LockUnavailable(_))) => {
            warn!(error = %err, "sync trigger failed to take the lock");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "sync lock unavailable", "detail": err.to_string() })),
            )
                .into_response()
        }
        Err(err) => {
            error!(error = %err, "sync run task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "sync run failed", "detail": err.to_string() })),
            )
                .into_response()
        }
    }
}

async fn sync_status_handler(State(state): State<Arc<AppState>>, Query(query): Query<StatusQuery>) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_STATUS_LIMIT).clamp(1, MAX_STATUS_LIMIT);
    match state.orchestrator.status(limit).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "failed to read sync status", "detail": err.to_string() })),
        )
            .into_response(),
    }
}
