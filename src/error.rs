//! Error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failure talking to the upstream answer API.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Upstream request timed out after {0}s")]
    Timeout(u64),

    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),
}

/// Terminal failure states of a chat-completion request.
///
/// Every variant is produced before the event stream is opened.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Unauthorized => StatusCode::UNAUTHORIZED,
            // Malformed bodies keep the 500 the Python service returned.
            ProxyError::InvalidRequest(_) | ProxyError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
