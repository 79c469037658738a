//! Kagi FastGPT client.
//!
//! FastGPT answers a query in one response; there is no upstream streaming.
//! Request: `POST {"query": ...}` with `Authorization: Bot <key>`.
//! Success: `{"meta": {...}, "data": {"output": ..., "tokens": ..., "references": [...]}}`.
//! Failure: `{"meta": {...}, "data": null, "error": [{"code": ..., "msg": ...}]}`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::AnswerSource;
use crate::config::UpstreamConfig;
use crate::error::UpstreamError;

#[derive(Debug, Serialize)]
struct FastGptRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct FastGptResponse {
    #[serde(default)]
    data: Option<FastGptData>,
    #[serde(default)]
    error: Option<Vec<FastGptErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct FastGptData {
    output: Option<String>,
    #[serde(default)]
    tokens: Option<u64>,
    #[serde(default)]
    references: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FastGptErrorEntry {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
}

/// Client for the Kagi FastGPT endpoint.
#[derive(Clone)]
pub struct KagiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout_secs: u64,
}

impl std::fmt::Debug for KagiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KagiClient")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl KagiClient {
    /// Create a client with the given endpoint, key and timeout.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_secs,
        })
    }

    /// Create a client from validated configuration.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let api_key = config.api_key.clone().unwrap_or_default();
        Self::new(config.base_url.clone(), api_key, config.timeout_secs)
    }

    async fn send(&self, prompt: &str) -> Result<String, UpstreamError> {
        let resp = self
            .http
            .post(&self.base_url)
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.api_key))
            .json(&FastGptRequest { query: prompt })
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let parsed: FastGptResponse = serde_json::from_slice(&body)
            .map_err(|e| UpstreamError::MalformedResponse(e.to_string()))?;

        if let Some(errors) = parsed.error.as_deref().filter(|errs| !errs.is_empty()) {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message: join_errors(errors),
            });
        }

        let data = parsed
            .data
            .ok_or_else(|| UpstreamError::MalformedResponse("missing `data`".to_string()))?;

        debug!(
            tokens = data.tokens,
            references = data.references.len(),
            "FastGPT answer received"
        );

        data.output
            .ok_or_else(|| UpstreamError::MalformedResponse("missing `data.output`".to_string()))
    }

    fn classify(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(self.timeout_secs)
        } else {
            UpstreamError::Transport(err)
        }
    }
}

#[async_trait]
impl AnswerSource for KagiClient {
    async fn query(&self, prompt: &str) -> Result<String, UpstreamError> {
        let started = Instant::now();
        let result = self.send(prompt).await;

        match &result {
            Ok(answer) => debug!(
                answer_chars = answer.chars().count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Kagi query succeeded"
            ),
            Err(e) => error!(
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Kagi API error"
            ),
        }

        result
    }
}

/// Best-effort description of a non-2xx body.
fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<FastGptResponse>(body) {
        Ok(FastGptResponse {
            error: Some(errors),
            ..
        }) if !errors.is_empty() => join_errors(&errors),
        _ => {
            let text = String::from_utf8_lossy(body);
            let text = text.trim();
            if text.is_empty() {
                "empty response body".to_string()
            } else {
                text.chars().take(512).collect()
            }
        }
    }
}

fn join_errors(errors: &[FastGptErrorEntry]) -> String {
    errors
        .iter()
        .map(|e| match (e.code, e.msg.as_deref()) {
            (Some(code), Some(msg)) => format!("{msg} (code {code})"),
            (None, Some(msg)) => msg.to_string(),
            (Some(code), None) => format!("error code {code}"),
            (None, None) => "unknown error".to_string(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_message() {
        let body = br#"{"meta":{"id":"x"},"data":null,"error":[{"code":1,"msg":"Insufficient credit"}]}"#;
        assert_eq!(error_message(body), "Insufficient credit (code 1)");
    }

    #[test]
    fn test_plain_text_error_message() {
        assert_eq!(error_message(b"  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(error_message(b""), "empty response body");
    }

    #[test]
    fn test_success_body_parses() {
        let body = r#"{"meta":{"id":"x","node":"us-east","ms":900},
            "data":{"output":"Answer.","tokens":12,"references":[{"title":"t","snippet":"s","url":"u"}]}}"#;
        let parsed: FastGptResponse = serde_json::from_str(body).unwrap();
        let data = parsed.data.unwrap();
        assert_eq!(data.output.as_deref(), Some("Answer."));
        assert_eq!(data.references.len(), 1);
    }
}
