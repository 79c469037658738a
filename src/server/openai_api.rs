//! OpenAI-compatible HTTP API.
//!
//! Implements the subset of the OpenAI API this proxy serves:
//! - POST /v1/chat/completions (always streamed)
//! - GET /v1/models
//! - GET /health

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::ProxyError;
use crate::server::auth::BearerAuth;
use crate::stream::framer::{unix_timestamp, Frames};
use crate::stream::segmenter::split;
use crate::upstream::AnswerSource;

/// Application state shared across handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub upstream: Arc<dyn AnswerSource>,
    pub auth: BearerAuth,
}

impl AppState {
    /// Build state from validated configuration and an answer source.
    pub fn new(config: Arc<Config>, upstream: Arc<dyn AnswerSource>) -> Self {
        let auth = BearerAuth::new(config.auth.api_key.clone().unwrap_or_default());
        Self {
            config,
            upstream,
            auth,
        }
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/models", get(list_models))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Request/Response Types ────────────────────────────────────────────────

/// Chat completion request (OpenAI-compatible). Only `messages` is consulted.
///
/// Earlier messages are kept as raw JSON: tool-call turns with `null` content
/// or role-less entries must not fail the request.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: String,
    pub content: MessageContent,
}

/// Message content: plain text or a list of OpenAI content parts.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl MessageContent {
    /// Flatten to plain text; non-text parts are skipped.
    pub fn to_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter(|p| p.kind == "text")
                .filter_map(|p| p.text.as_deref())
                .collect(),
        }
    }
}

impl ChatCompletionRequest {
    /// Content of the last message, which is the only one forwarded upstream.
    pub fn last_user_input(&self) -> Result<String, ProxyError> {
        let last = self
            .messages
            .last()
            .ok_or_else(|| ProxyError::InvalidRequest("`messages` must not be empty".to_string()))?;
        let last: ChatMessage = serde_json::from_value(last.clone()).map_err(|e| {
            ProxyError::InvalidRequest(format!("Invalid last message: {e}"))
        })?;
        let text = last.content.to_text();
        if text.trim().is_empty() {
            return Err(ProxyError::InvalidRequest(
                "last message has no text content".to_string(),
            ));
        }
        Ok(text)
    }
}

/// Model listing response.
#[derive(Debug, Serialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub owned_by: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn chat_completions(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let (parts, body) = request.into_parts();
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if let Err(e) = state.auth.verify_headers(&parts.headers) {
        warn!(request_id, peer, "Invalid API key attempt");
        return e.into_response();
    }

    let max_body = state.config.server.max_body_bytes;
    let result = match axum::body::to_bytes(body, max_body).await {
        Ok(bytes) => complete(&state, &request_id, &bytes).await,
        Err(e) => Err(ProxyError::InvalidRequest(format!("Failed to read request body: {e}"))),
    };

    result.unwrap_or_else(|e| {
        error!(request_id, error = %e, "Request handling failed");
        e.into_response()
    })
}

/// Authenticated path: parse, query upstream, then open the stream.
async fn complete(state: &AppState, request_id: &str, body: &Bytes) -> Result<Response, ProxyError> {
    let req: ChatCompletionRequest = serde_json::from_slice(body)
        .map_err(|e| ProxyError::InvalidRequest(format!("Invalid request body: {e}")))?;
    let prompt = req.last_user_input()?;

    info!(
        request_id,
        messages = req.messages.len(),
        prompt_chars = prompt.chars().count(),
        "Chat completion request"
    );

    let answer = state.upstream.query(&prompt).await?;

    let stream_cfg = &state.config.stream;
    let chunks = split(&answer, stream_cfg.chunk_size);
    info!(
        request_id,
        answer_chars = answer.chars().count(),
        chunks = chunks.len(),
        "Streaming answer"
    );

    let frames = Frames::new(chunks, stream_cfg.model.clone());
    Ok(sse_response(Body::from_stream(frames.into_byte_stream())))
}

fn sse_response(body: Body) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        [("X-Accel-Buffering", "no")],
        body,
    )
        .into_response()
}

async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelList> {
    Json(ModelList {
        object: "list".to_string(),
        data: vec![ModelInfo {
            id: state.config.stream.model.clone(),
            object: "model".to_string(),
            created: unix_timestamp(),
            owned_by: "kagi".to_string(),
        }],
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
