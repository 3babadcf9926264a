//! Tool-using agent loop
//!
//! Each iteration sends the live tool manifest plus the pruned history to
//! the model without streaming. A response containing a tool-call candidate
//! is recorded, executed and answered with the tool's output; a response
//! without one ends the loop and the final answer is streamed. When the
//! iteration cap is reached a fixed message is recorded instead.

use std::sync::Arc;

use crate::agent::conversation::{lock, ConversationHandle};
use crate::agent::history::{prune_history, strip_reasoning};
use crate::agent::metrics::{AgentLoopMetrics, LoopOutcome};
use crate::agent::responder::StreamResponder;
use crate::config::AgentConfig;
use crate::error::{ChatError, Result};
use crate::events::{ChatEvent, EventSink};
use crate::inference::{ChatMessage, InferenceClient, Role};
use crate::storage::{save_message_blocking, MessageStore};
use crate::tools::{detect_tool_call, ToolCall, ToolRouter};

/// Message recorded when the iteration cap is reached
pub fn exhaustion_message(limit: usize) -> String {
    format!(
        "The assistant reached the maximum number of tool calls ({}) without providing a final answer. The task has been stopped.",
        limit
    )
}

/// Bounded tool-calling loop for one session
pub struct ToolAgent {
    router: Arc<ToolRouter>,
    inference: Arc<dyn InferenceClient>,
    store: Arc<dyn MessageStore>,
    sink: Arc<dyn EventSink>,
    responder: Arc<StreamResponder>,
    config: AgentConfig,
}

impl ToolAgent {
    /// Create an agent
    pub fn new(
        router: Arc<ToolRouter>,
        inference: Arc<dyn InferenceClient>,
        store: Arc<dyn MessageStore>,
        sink: Arc<dyn EventSink>,
        responder: Arc<StreamResponder>,
        config: AgentConfig,
    ) -> Self {
        Self {
            router,
            inference,
            store,
            sink,
            responder,
            config,
        }
    }

    /// Run the loop until a final answer is streamed or the cap is reached
    ///
    /// Exactly one `StreamEnd` is emitted for the run.
    ///
    /// # Errors
    ///
    /// Returns the inference error when a dispatch call fails or the final
    /// stream cannot be opened. Tool failures are not errors: they are fed
    /// back to the model as the tool result.
    pub async fn run(&self, session_id: i64, conversation: &ConversationHandle) -> Result<()> {
        let limit = self.config.tool_call_iterations.max(1);
        let metrics = AgentLoopMetrics::start();

        for iteration in 1..=limit {
            let manifest = self.router.tool_manifest().await;
            let messages = self.prompt(&manifest, conversation);
            tracing::debug!(
                "Tool agent iteration {}/{} for session {} ({} messages)",
                iteration,
                limit,
                session_id,
                messages.len()
            );

            let response = match self.inference.complete(&messages).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!("Tool agent dispatch failed: {}", e);
                    self.sink.emit(ChatEvent::Error {
                        session_id,
                        message: e.to_string(),
                    });
                    self.sink.emit(ChatEvent::StreamEnd { session_id });
                    metrics.record(iteration, LoopOutcome::DispatchFailed);
                    return Err(e);
                }
            };

            let Some(candidate) = detect_tool_call(&response) else {
                tracing::info!("No tool call detected; streaming final answer");
                let messages = self.prompt(&manifest, conversation);
                metrics.record(iteration, LoopOutcome::FinalAnswer);
                return self
                    .responder
                    .respond(session_id, conversation, &messages)
                    .await
                    .map(|_| ());
            };

            tracing::info!("Detected tool call: {}", candidate);
            self.run_tool_call(session_id, conversation, &response, candidate)
                .await;
        }

        tracing::warn!(
            "{}",
            ChatError::MaxIterationsExceeded {
                limit,
                message: "no final answer from tool agent".to_string(),
            }
        );

        let message = exhaustion_message(limit);
        lock(conversation).push(ChatMessage::assistant(message.clone()));
        self.save(session_id, conversation, Role::Assistant, &message)
            .await;
        self.sink.emit(ChatEvent::StreamChunk {
            session_id,
            text: message,
        });
        self.sink.emit(ChatEvent::StreamEnd { session_id });
        metrics.record(limit, LoopOutcome::Exhausted);
        Ok(())
    }

    /// System manifest followed by the pruned history
    fn prompt(&self, manifest: &str, conversation: &ConversationHandle) -> Vec<ChatMessage> {
        let history = prune_history(lock(conversation).messages(), self.config.history_window);
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(manifest));
        messages.extend(history);
        messages
    }

    async fn run_tool_call(
        &self,
        session_id: i64,
        conversation: &ConversationHandle,
        response: &str,
        candidate: &str,
    ) {
        self.save(session_id, conversation, Role::Assistant, response)
            .await;
        lock(conversation).push(ChatMessage::assistant(strip_reasoning(response)));

        let (tool_name, result) = match ToolCall::parse(candidate) {
            Ok(call) => {
                let result = self.router.execute(&call).await;
                (Some(call.tool_name), result)
            }
            Err(e) => (None, Err(e)),
        };

        let content = match result {
            Ok(output) => output.joined(),
            Err(e) => {
                tracing::warn!("Error executing tool call: {}", e);
                format!("Error executing tool: {}", e)
            }
        };

        let role = if self.config.tool_results_as_user {
            Role::User
        } else {
            Role::Tool
        };
        lock(conversation).push(ChatMessage::new(role, content.clone()));
        self.save(session_id, conversation, role, &content).await;

        self.sink.emit(ChatEvent::ToolResult {
            session_id,
            tool_name,
            content,
        });
    }

    async fn save(
        &self,
        session_id: i64,
        conversation: &ConversationHandle,
        role: Role,
        content: &str,
    ) {
        let closed = lock(conversation).is_closed();
        if closed {
            tracing::debug!("Session {} was deleted; {} message not saved", session_id, role);
            return;
        }
        if let Err(e) = save_message_blocking(&self.store, session_id, role, content).await {
            tracing::error!("Error saving {} message: {}", role, e);
        }
    }
}
