//! HTTP server providing an OpenAI-compatible API.
//!
//! - [`openai_api`]: Request/response types and route handlers
//! - [`auth`]: Bearer-key check for chat completions

pub mod auth;
pub mod openai_api;
