//! Tool dispatch: need detection, manifest rendering and execution

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use metrics::increment_counter;

use crate::error::{ChatError, Result};
use crate::inference::{ChatMessage, InferenceClient};
use crate::tools::{ToolCall, ToolOutput, ToolServerRegistry};

const MANIFEST_HEADER: &str = "You have access to the following tools. To use a tool, you must respond with a JSON object with 'tool_name' and 'arguments' keys.\n\nAvailable Tools:\n";

/// Routes tool requests from the model to connected servers
pub struct ToolRouter {
    registry: Arc<ToolServerRegistry>,
    inference: Arc<dyn InferenceClient>,
    cooldown: Duration,
    last_calls: Mutex<HashMap<String, Instant>>,
}

impl ToolRouter {
    /// Create a router over `registry`
    ///
    /// `cooldown` is the minimum spacing between successful calls of the
    /// same tool; zero disables the check.
    pub fn new(
        registry: Arc<ToolServerRegistry>,
        inference: Arc<dyn InferenceClient>,
        cooldown: Duration,
    ) -> Self {
        Self {
            registry,
            inference,
            cooldown,
            last_calls: Mutex::new(HashMap::new()),
        }
    }

    /// The registry this router dispatches to
    pub fn registry(&self) -> &Arc<ToolServerRegistry> {
        &self.registry
    }

    /// Ask the model whether `query` needs external tools
    ///
    /// Returns `false` without any inference call when no servers are
    /// connected. Only a reply of exactly "yes" (case and surrounding
    /// whitespace ignored) counts as a positive answer.
    pub async fn needs_tools(&self, query: &str) -> Result<bool> {
        if self.registry.is_empty().await {
            return Ok(false);
        }

        let prompt = format!(
            "You are a dispatcher. Your only job is to decide if a user's request needs access to external tools to be answered. Respond with only 'yes' or 'no'. User Request: \"{}\"",
            query
        );
        let answer = self
            .inference
            .complete(&[ChatMessage::user(prompt)])
            .await?;
        let needs = answer.trim().to_lowercase() == "yes";
        tracing::debug!("Dispatcher answered {:?}, needs tools: {}", answer, needs);
        Ok(needs)
    }

    /// Render the tool manifest across all connected servers
    ///
    /// Servers whose tool listing fails are logged and skipped.
    pub async fn tool_manifest(&self) -> String {
        let mut manifest = String::from(MANIFEST_HEADER);

        for server in self.registry.snapshot().await {
            let tools = match server.list_tools().await {
                Ok(tools) => tools,
                Err(e) => {
                    tracing::warn!("Failed to list tools from '{}': {}", server.name(), e);
                    continue;
                }
            };

            for tool in tools {
                manifest.push_str(&format!(
                    "- Tool: {}\n  Description: {}\n",
                    tool.name, tool.description
                ));
                if tool.has_trivial_schema() {
                    continue;
                }
                let schema = serde_json::to_string_pretty(&tool.input_schema)
                    .unwrap_or_else(|_| tool.input_schema.to_string());
                manifest.push_str(&format!(
                    "  Arguments Schema:\n  {}\n",
                    schema.replace('\n', "\n  ")
                ));
            }
        }

        manifest
    }

    /// Parse and execute a tool call emitted by the model
    ///
    /// # Errors
    ///
    /// - [`ChatError::ToolCallParse`] when `raw` is not a valid call
    /// - [`ChatError::ToolCooldown`] when the tool ran too recently
    /// - [`ChatError::ToolExecution`] when the owning server fails
    /// - [`ChatError::ToolNotFound`] when no server offers the tool
    pub async fn execute_tool_call(&self, raw: &str) -> Result<ToolOutput> {
        let call = ToolCall::parse(raw)?;
        self.execute(&call).await
    }

    /// Execute an already parsed tool call
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolOutput> {
        let tool = call.tool_name.as_str();
        self.check_cooldown(tool)?;

        for server in self.registry.snapshot().await {
            let tools = match server.list_tools().await {
                Ok(tools) => tools,
                Err(e) => {
                    tracing::warn!("Failed to list tools from '{}': {}", server.name(), e);
                    continue;
                }
            };
            if !tools.iter().any(|t| t.name == tool) {
                continue;
            }

            tracing::info!("Calling tool '{}' on server '{}'", tool, server.name());
            let output = match server.call_tool(tool, call.arguments.clone()).await {
                Ok(output) => output,
                Err(e) => {
                    increment_counter!("tool_calls_total", "tool" => tool.to_string(), "outcome" => "error");
                    return Err(ChatError::ToolExecution {
                        tool: tool.to_string(),
                        message: e.to_string(),
                    }
                    .into());
                }
            };

            self.mark_used(tool);
            increment_counter!("tool_calls_total", "tool" => tool.to_string(), "outcome" => "success");
            return Ok(output);
        }

        increment_counter!("tool_calls_total", "tool" => tool.to_string(), "outcome" => "not_found");
        Err(ChatError::ToolNotFound(tool.to_string()).into())
    }

    fn check_cooldown(&self, tool: &str) -> Result<()> {
        if self.cooldown.is_zero() {
            return Ok(());
        }

        let last = self
            .last_calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(tool)
            .copied();

        if let Some(last) = last {
            let elapsed = last.elapsed();
            if elapsed < self.cooldown {
                let remaining = self.cooldown - elapsed;
                let remaining_secs =
                    remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
                increment_counter!("tool_calls_total", "tool" => tool.to_string(), "outcome" => "cooldown");
                return Err(ChatError::ToolCooldown {
                    tool: tool.to_string(),
                    remaining_secs,
                }
                .into());
            }
        }
        Ok(())
    }

    fn mark_used(&self, tool: &str) {
        if self.cooldown.is_zero() {
            return;
        }
        self.last_calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(tool.to_string(), Instant::now());
    }
}
