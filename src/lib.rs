//! fastgpt-proxy: OpenAI-compatible front end for Kagi FastGPT.
//!
//! FastGPT returns one complete answer per query. This crate forwards the
//! last chat message upstream, then replays the answer as an OpenAI
//! `chat.completion.chunk` event stream:
//!   request → auth → Kagi query → fixed-size chunks → SSE frames → `[DONE]`

pub mod config;
pub mod error;
pub mod server;
pub mod stream;
pub mod upstream;
