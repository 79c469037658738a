//! Upstream question-answering API.
//!
//! - [`kagi`]: Kagi FastGPT client

pub mod kagi;

use async_trait::async_trait;

use crate::error::UpstreamError;

pub use kagi::KagiClient;

/// Something that turns a prompt into one complete answer.
#[async_trait]
pub trait AnswerSource: Send + Sync {
    /// Send `prompt` and wait for the full answer text.
    async fn query(&self, prompt: &str) -> Result<String, UpstreamError>;
}
