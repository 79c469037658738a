//! SSE framing for simulated chat-completion streams.
//!
//! Turns an ordered list of text chunks into OpenAI-compatible
//! `chat.completion.chunk` frames followed by the `[DONE]` sentinel, each
//! encoded as `data: <payload>\n\n`.

use std::convert::Infallible;
use std::iter::FusedIterator;

use bytes::Bytes;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};

/// Payload of the terminating frame.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Streaming chat completion chunk (OpenAI-compatible).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub delta: ChunkDelta,
    pub index: usize,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
}

/// One unit of the event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A content chunk.
    Chunk(ChatCompletionChunk),
    /// The end-of-stream sentinel.
    Done,
}

impl Frame {
    /// The text placed after `data: `.
    pub fn payload(&self) -> String {
        match self {
            Frame::Chunk(chunk) => serde_json::to_string(chunk).unwrap_or_else(|e| {
                tracing::error!(id = chunk.id, error = %e, "Failed to serialize chunk");
                String::new()
            }),
            Frame::Done => DONE_SENTINEL.to_string(),
        }
    }

    /// Wire encoding: `data: <payload>\n\n`.
    pub fn encode(&self) -> Bytes {
        Bytes::from(format!("data: {}\n\n", self.payload()))
    }
}

/// Forward-only sequence of frames for one response.
///
/// Yields one content frame per chunk, then exactly one [`Frame::Done`].
/// All frames share the `created` timestamp captured at construction.
#[derive(Debug)]
pub struct Frames {
    chunks: std::vec::IntoIter<String>,
    model: String,
    created: u64,
    next_index: usize,
    terminated: bool,
}

impl Frames {
    /// Frame `chunks` with the current wall-clock time as `created`.
    pub fn new(chunks: Vec<String>, model: impl Into<String>) -> Self {
        Self::with_created(chunks, model, unix_timestamp())
    }

    /// Frame `chunks` with an explicit `created` timestamp.
    pub fn with_created(chunks: Vec<String>, model: impl Into<String>, created: u64) -> Self {
        Self {
            chunks: chunks.into_iter(),
            model: model.into(),
            created,
            next_index: 0,
            terminated: false,
        }
    }

    pub fn created(&self) -> u64 {
        self.created
    }

    /// Adapt into the byte stream handed to the HTTP body.
    pub fn into_byte_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
        tokio_stream::iter(self.map(|frame| Ok(frame.encode())))
    }
}

impl Iterator for Frames {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if let Some(content) = self.chunks.next() {
            let index = self.next_index;
            self.next_index += 1;
            let finish_reason = self.chunks.as_slice().is_empty().then_some(FinishReason::Stop);

            return Some(Frame::Chunk(ChatCompletionChunk {
                id: format!("chatcmpl-{}-{index}", self.created),
                object: "chat.completion.chunk".to_string(),
                created: self.created,
                model: self.model.clone(),
                choices: vec![ChunkChoice {
                    delta: ChunkDelta { content },
                    index: 0,
                    finish_reason,
                }],
            }));
        }

        if self.terminated {
            None
        } else {
            self.terminated = true;
            Some(Frame::Done)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.chunks.len() + usize::from(!self.terminated);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Frames {}

impl FusedIterator for Frames {}

/// Frame `chunks` into an event-stream body.
pub fn frame(
    chunks: Vec<String>,
    model: impl Into<String>,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    Frames::new(chunks, model).into_byte_stream()
}

/// Current time in whole seconds since the Unix epoch.
pub fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
