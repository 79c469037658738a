//! Streaming emulation for single-shot answers.
//!
//! - [`segmenter`]: Fixed-size character chunking
//! - [`framer`]: OpenAI-compatible SSE frames and the `[DONE]` sentinel

pub mod framer;
pub mod segmenter;

pub use framer::{frame, Frame, Frames};
pub use segmenter::{segments, split};
