//! Chat message and OpenAI-compatible wire types

use crate::error::ChatError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the conversation
    System,
    /// The human, or a tool result injected on the human's behalf
    User,
    /// The model
    Assistant,
    /// A tool result, only used when role substitution is disabled
    Tool,
}

impl Role {
    /// Wire and storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "tool" => Ok(Role::Tool),
            other => Err(ChatError::Storage(format!("unknown message role: {}", other))),
        }
    }
}

/// A single message of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who produced the message
    pub role: Role,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Build a message with an explicit role
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Build a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Build a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Build an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Body of `POST /v1/chat/completions`
///
/// `n_predict` and `add_bos` are llama-server extensions.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    /// Full message list sent to the model
    pub messages: &'a [ChatMessage],
    /// Request an SSE response
    pub stream: bool,
    /// Maximum tokens to predict; -1 is unbounded
    pub n_predict: i64,
    /// Whether the server prepends a BOS token
    pub add_bos: bool,
}

/// Non-streaming completion response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    /// Candidate completions; only the first is used
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

/// One candidate of a non-streaming response
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    /// The generated message
    pub message: CompletionMessage,
}

/// Message part of a non-streaming choice
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionMessage {
    /// Generated text; some servers send null for empty output
    #[serde(default)]
    pub content: Option<String>,
}

/// One SSE `data:` payload of a streaming response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChunk {
    /// Candidate deltas; only the first is used
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// One candidate of a streaming chunk
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    /// Incremental content
    #[serde(default)]
    pub delta: ChunkDelta,
}

/// Incremental content of a streaming chunk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    /// Text fragment; absent on role-only and finish chunks
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// Text carried by the first choice, if any
    pub fn delta_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|text| !text.is_empty())
    }
}

/// Response of `GET /health`
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    /// Server status, `"ok"` when a model is loaded
    pub status: String,
}
