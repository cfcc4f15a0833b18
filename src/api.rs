//! HTTP+JSON API of the master.
//!
//! Thin glue over [`Scheduler`]: each handler takes the shared lock,
//! performs exactly one scheduler operation, and maps the outcome to a
//! wire response. No handler does I/O while holding the lock.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

use crate::error::DispatchError;
use crate::scheduler::{Scheduler, TaskHandout, TaskOutcome, TaskSpec};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub scheduler: Arc<RwLock<Scheduler>>,
}

#[derive(Debug, Deserialize)]
struct SubmitTaskRequest {
    task_id: String,
    #[serde(rename = "type")]
    task_type: String,
    payload: Value,
    #[serde(default = "default_priority")]
    priority: i64,
}

fn default_priority() -> i64 {
    10
}

#[derive(Serialize)]
struct SubmitTaskResponse {
    status: &'static str,
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct GetTaskParams {
    worker_id: String,
}

#[derive(Serialize)]
struct GetTaskResponse {
    task: Option<TaskHandout>,
}

#[derive(Debug, Deserialize)]
struct SubmitResultRequest {
    task_id: String,
    status: TaskOutcome,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    worker_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HeartbeatRequest {
    worker_id: String,
    /// Epoch seconds, supplied by the worker's clock
    timestamp: f64,
}

#[derive(Serialize)]
struct StatusField {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = match &self {
            DispatchError::DuplicateTask(_) => StatusCode::BAD_REQUEST,
            DispatchError::UnknownTask(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Build the master's router. Permissive CORS so a browser dashboard can
/// poll `/status` directly.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/submit_task", post(submit_task_handler))
        .route("/get_task", get(get_task_handler))
        .route("/submit_result", post(submit_result_handler))
        .route("/heartbeat", post(heartbeat_handler))
        .route("/status", get(status_handler))
        .layer(cors)
        .with_state(state)
}

async fn submit_task_handler(
    State(state): State<ApiState>,
    Json(req): Json<SubmitTaskRequest>,
) -> Result<Json<SubmitTaskResponse>, DispatchError> {
    let spec = TaskSpec {
        task_id: req.task_id.clone(),
        task_type: req.task_type,
        payload: req.payload,
        priority: req.priority,
    };

    let mut scheduler = state.scheduler.write().await;
    scheduler.submit(spec, Utc::now())?;

    Ok(Json(SubmitTaskResponse {
        status: "accepted",
        task_id: req.task_id,
    }))
}

async fn get_task_handler(
    State(state): State<ApiState>,
    Query(params): Query<GetTaskParams>,
) -> Json<GetTaskResponse> {
    let mut scheduler = state.scheduler.write().await;
    let task = scheduler.fetch(&params.worker_id, Utc::now());
    Json(GetTaskResponse { task })
}

async fn submit_result_handler(
    State(state): State<ApiState>,
    Json(req): Json<SubmitResultRequest>,
) -> Result<Json<StatusField>, DispatchError> {
    let mut scheduler = state.scheduler.write().await;
    scheduler.submit_result(&req.task_id, req.status, req.result, req.worker_id.as_deref())?;
    Ok(Json(StatusField { status: "ok" }))
}

async fn heartbeat_handler(
    State(state): State<ApiState>,
    Json(req): Json<HeartbeatRequest>,
) -> Json<StatusField> {
    // Client clocks are trusted; an unrepresentable timestamp falls back
    // to server receipt time.
    let at = DateTime::<Utc>::from_timestamp_millis((req.timestamp * 1000.0) as i64)
        .unwrap_or_else(Utc::now);

    let mut scheduler = state.scheduler.write().await;
    scheduler.heartbeat(&req.worker_id, at);
    Json(StatusField { status: "alive" })
}

async fn status_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let scheduler = state.scheduler.read().await;
    Json(scheduler.status())
}
