//! Keyword bridge -- axum routes serving the keywords over HTTP/JSON.
//!
//! One route per keyword; request bodies are the keyword arguments as a
//! JSON object and responses wrap payloads as `{"data": ...}` or carry
//! `{"error": "..."}` with a 4xx/5xx status. There is no protocol logic of
//! its own here beyond dispatch.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::command::{ClientOptions, ServerOptions};
use crate::{Iperf3, KeywordError};

/// Shared bridge state: one keyword facade behind a mutex.
///
/// The mutex serializes keyword calls, so at most one server handle exists
/// and concurrent remote calls simply queue. Running keywords concurrently
/// against one instance is not a supported usage pattern.
#[derive(Clone)]
pub struct AppState {
    keywords: Arc<Mutex<Iperf3>>,
}

impl AppState {
    pub fn new(keywords: Iperf3) -> Self {
        Self {
            keywords: Arc::new(Mutex::new(keywords)),
        }
    }
}

/// Build the bridge router with all keyword routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/keywords", get(list_keywords))
        .route("/keywords/start_server", post(start_server))
        .route("/keywords/stop_server", post(stop_server))
        .route("/keywords/run_client", post(run_client))
        .fallback(fallback)
        .with_state(state)
}

impl IntoResponse for KeywordError {
    fn into_response(self) -> Response {
        let status = match &self {
            KeywordError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn fallback() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn list_keywords() -> Json<Value> {
    Json(json!({
        "data": ["start_server", "stop_server", "run_client"]
    }))
}

async fn start_server(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, KeywordError> {
    let options: ServerOptions = decode_arguments(&body)?;
    state.keywords.lock().await.start_server(options)?;
    Ok(Json(json!({ "data": null })))
}

async fn stop_server(State(state): State<AppState>) -> Json<Value> {
    let stats = state.keywords.lock().await.stop_server().await;
    Json(json!({ "data": stats }))
}

async fn run_client(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, KeywordError> {
    let options: ClientOptions = decode_arguments(&body)?;
    let report = state.keywords.lock().await.run_client(options).await?;
    Ok(Json(json!({ "data": report })))
}

/// Decode keyword arguments from a request body; an empty body means all
/// defaults (remote callers may invoke argument-less keywords bare).
fn decode_arguments<T>(body: &[u8]) -> Result<T, KeywordError>
where
    T: serde::de::DeserializeOwned + Default,
{
    if body.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|err| KeywordError::InvalidArgument {
        reason: format!("undecodable keyword arguments: {err}"),
    })
}
