//! Inference server abstraction
//!
//! The chat service only depends on [`InferenceClient`]; the production
//! implementation is [`llama::LlamaServerClient`], which speaks the
//! OpenAI-compatible chat completions API of llama-server.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;

pub mod llama;
pub mod sse;
pub mod types;

pub use llama::LlamaServerClient;
pub use types::{ChatMessage, Role};

/// Ordered stream of text deltas from a streaming completion
///
/// An `Err` item reports a read failure; no further items follow it.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A chat completion backend
///
/// Neither method applies a timeout: local models can take arbitrarily long.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Request a full, non-streaming completion
    ///
    /// # Errors
    ///
    /// Returns a transport error when the server is unreachable and an
    /// inference error when the response carries no content.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Open a streaming completion
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be sent or the server
    /// rejects it; failures after the stream opened surface as `Err` items.
    async fn stream(&self, messages: &[ChatMessage]) -> Result<DeltaStream>;
}
