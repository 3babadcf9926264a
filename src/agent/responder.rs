//! Streaming answer path
//!
//! Opens a streaming completion, makes it stoppable through the session's
//! [`Conversation`](super::Conversation), relays it to the UI and records
//! the result in storage and in memory.

use std::sync::Arc;

use futures::stream::{AbortHandle, Abortable};

use crate::agent::conversation::{lock, ConversationHandle};
use crate::agent::history::strip_reasoning;
use crate::error::Result;
use crate::events::{ChatEvent, EventSink};
use crate::inference::{ChatMessage, DeltaStream, InferenceClient, Role};
use crate::storage::{save_message_blocking, MessageStore};
use crate::stream::{RelayConfig, RelayOutcome, StreamRelay, TokenCounter};

/// Streams one assistant answer for a session
pub struct StreamResponder {
    inference: Arc<dyn InferenceClient>,
    store: Arc<dyn MessageStore>,
    sink: Arc<dyn EventSink>,
    relay: StreamRelay,
    token_counter: Arc<TokenCounter>,
}

impl StreamResponder {
    /// Create a responder
    pub fn new(
        inference: Arc<dyn InferenceClient>,
        store: Arc<dyn MessageStore>,
        sink: Arc<dyn EventSink>,
        relay_config: RelayConfig,
        token_counter: Arc<TokenCounter>,
    ) -> Self {
        Self {
            inference,
            store,
            relay: StreamRelay::new(Arc::clone(&sink), relay_config),
            sink,
            token_counter,
        }
    }

    /// Stream an answer to `messages` and record it
    ///
    /// The raw text is persisted; the in-memory history receives the copy
    /// with reasoning spans stripped. Exactly one `StreamEnd` is emitted,
    /// including when the stream cannot be opened. Nothing is recorded when
    /// the conversation was closed while streaming.
    ///
    /// # Errors
    ///
    /// Returns the inference error when the stream cannot be opened. Read
    /// failures after that end the stream normally and are reported through
    /// [`RelayOutcome::failed`].
    pub async fn respond(
        &self,
        session_id: i64,
        conversation: &ConversationHandle,
        messages: &[ChatMessage],
    ) -> Result<RelayOutcome> {
        let deltas = match self.inference.stream(messages).await {
            Ok(deltas) => deltas,
            Err(e) => {
                tracing::error!("Failed to open stream for session {}: {}", session_id, e);
                self.sink.emit(ChatEvent::Error {
                    session_id,
                    message: e.to_string(),
                });
                self.sink.emit(ChatEvent::StreamEnd { session_id });
                return Err(e);
            }
        };

        let (handle, registration) = AbortHandle::new_pair();
        lock(conversation).set_active_stream(handle);
        let deltas: DeltaStream = Box::pin(Abortable::new(deltas, registration));

        let store = Arc::clone(&self.store);
        let memory = Arc::clone(conversation);
        let outcome = self
            .relay
            .run(session_id, deltas, |text| async move {
                if text.is_empty() {
                    tracing::debug!("Empty response for session {}; nothing to save", session_id);
                    return;
                }
                let closed = lock(&memory).is_closed();
                if closed {
                    tracing::debug!("Session {} was deleted; answer not saved", session_id);
                    return;
                }
                if let Err(e) =
                    save_message_blocking(&store, session_id, Role::Assistant, &text).await
                {
                    tracing::error!("Error saving assistant message: {}", e);
                }
                lock(&memory).push(ChatMessage::assistant(strip_reasoning(&text)));
            })
            .await;

        let closed = {
            let mut conversation = lock(conversation);
            conversation.clear_active_stream();
            conversation.is_closed()
        };
        if closed {
            return Ok(outcome);
        }

        if outcome.failed {
            tracing::warn!(
                "Stream for session {} ended early after {} chars",
                session_id,
                outcome.text.len()
            );
        }

        let stats = self
            .token_counter
            .record(session_id, &outcome.text, outcome.elapsed);
        self.sink.emit(ChatEvent::TokenStats {
            session_id,
            tokens: stats.tokens,
            tokens_per_second: stats.tokens_per_second,
            session_total: stats.session_total,
        });

        Ok(outcome)
    }
}
