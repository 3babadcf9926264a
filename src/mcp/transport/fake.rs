//! In-process scripted MCP server for tests
//!
//! [`FakeTransport`] answers `initialize`, `tools/list` (paginated) and
//! `tools/call` from a [`FakeServerScript`] as soon as the client sends
//! them, and records every message it receives.

use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use std::sync::{Arc, Mutex as StdMutex};

use futures::Stream;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};

use crate::error::{ChatError, Result};
use crate::mcp::transport::Transport;
use crate::mcp::types::LATEST_PROTOCOL_VERSION;

/// Behaviour of a [`FakeTransport`]
#[derive(Debug, Clone)]
pub struct FakeServerScript {
    /// Revision returned from `initialize`
    pub protocol_version: String,
    /// Tool definitions as raw JSON objects
    pub tools: Vec<Value>,
    /// Tools per `tools/list` page; all on one page when `None`
    pub page_size: Option<usize>,
    /// `tools/call` results keyed by tool name
    pub call_results: HashMap<String, Value>,
    /// Methods the server never answers
    pub unresponsive: HashSet<String>,
    /// Lines produced on the diagnostic stream
    pub stderr: Vec<String>,
}

impl Default for FakeServerScript {
    fn default() -> Self {
        Self {
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            tools: Vec::new(),
            page_size: None,
            call_results: HashMap::new(),
            unresponsive: HashSet::new(),
            stderr: Vec::new(),
        }
    }
}

impl FakeServerScript {
    /// Add a tool whose call returns the given text
    pub fn with_text_tool(mut self, name: &str, description: &str, reply: &str) -> Self {
        self.tools.push(json!({
            "name": name,
            "description": description,
            "inputSchema": {"type": "object"}
        }));
        self.call_results.insert(
            name.to_string(),
            json!({"content": [{"type": "text", "text": reply}]}),
        );
        self
    }

    /// Never answer `method`
    pub fn unresponsive_to(mut self, method: &str) -> Self {
        self.unresponsive.insert(method.to_string());
        self
    }
}

/// Scripted in-process [`Transport`]
#[derive(Debug)]
pub struct FakeTransport {
    script: FakeServerScript,
    inbound_tx: mpsc::UnboundedSender<String>,
    inbound_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    received: StdMutex<Vec<Value>>,
}

impl FakeTransport {
    /// Create a transport backed by `script`
    pub fn new(script: FakeServerScript) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();
        Self {
            script,
            inbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            received: StdMutex::new(Vec::new()),
        }
    }

    /// Push a server-initiated message to the client
    pub fn inject(&self, message: Value) {
        let _ = self.inbound_tx.send(message.to_string());
    }

    /// Every message the client sent, in order
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Methods of the messages the client sent, in order
    pub fn received_methods(&self) -> Vec<String> {
        self.received()
            .iter()
            .filter_map(|m| m["method"].as_str().map(str::to_string))
            .collect()
    }

    fn answer(&self, request: &Value) -> Option<Value> {
        let method = request["method"].as_str()?;
        let id = request.get("id").filter(|id| !id.is_null())?.clone();
        if self.script.unresponsive.contains(method) {
            return None;
        }

        let outcome = match method {
            "initialize" => Ok(json!({
                "protocolVersion": self.script.protocol_version,
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "fake", "version": "0.0.1"}
            })),
            "tools/list" => Ok(self.tools_page(request["params"]["cursor"].as_str())),
            "tools/call" => {
                let name = request["params"]["name"].as_str().unwrap_or_default();
                self.script
                    .call_results
                    .get(name)
                    .cloned()
                    .ok_or_else(|| format!("Unknown tool: {}", name))
            }
            other => Err(format!("Method not found: {}", other)),
        };

        Some(match outcome {
            Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
            Err(message) => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32602, "message": message}
            }),
        })
    }

    fn tools_page(&self, cursor: Option<&str>) -> Value {
        let start: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let size = self.script.page_size.unwrap_or(self.script.tools.len().max(1));
        let end = (start + size).min(self.script.tools.len());
        let tools = self.script.tools[start.min(end)..end].to_vec();
        if end < self.script.tools.len() {
            json!({"tools": tools, "nextCursor": end.to_string()})
        } else {
            json!({"tools": tools})
        }
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn send(&self, message: String) -> Result<()> {
        let value: Value = serde_json::from_str(&message)
            .map_err(|e| ChatError::McpTransport(format!("fake server got bad JSON: {}", e)))?;
        self.received.lock().unwrap_or_else(|p| p.into_inner()).push(value.clone());

        if let Some(reply) = self.answer(&value) {
            self.inbound_tx
                .send(reply.to_string())
                .map_err(|_| ChatError::McpTransport("fake server closed".to_string()))?;
        }
        Ok(())
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        let rx = Arc::clone(&self.inbound_rx);
        Box::pin(futures::stream::unfold(rx, |rx| async move {
            let item = rx.lock().await.recv().await?;
            Some((item, rx))
        }))
    }

    fn receive_err(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        Box::pin(futures::stream::iter(self.script.stderr.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_paginates_tool_list() {
        let script = FakeServerScript {
            page_size: Some(1),
            ..FakeServerScript::default()
        }
        .with_text_tool("a", "first", "A")
        .with_text_tool("b", "second", "B");
        let transport = FakeTransport::new(script);

        transport
            .send(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}}"#.into())
            .await
            .unwrap();
        let mut inbound = transport.receive();
        let page: Value = serde_json::from_str(&inbound.next().await.unwrap()).unwrap();
        assert_eq!(page["result"]["tools"][0]["name"], "a");
        assert_eq!(page["result"]["nextCursor"], "1");
    }

    #[tokio::test]
    async fn test_notifications_get_no_reply() {
        let transport = FakeTransport::new(FakeServerScript::default());
        transport
            .send(r#"{"jsonrpc":"2.0","method":"notifications/initialized","params":{}}"#.into())
            .await
            .unwrap();
        assert_eq!(
            transport.received_methods(),
            vec!["notifications/initialized"]
        );

        let mut inbound = transport.receive();
        let next =
            tokio::time::timeout(std::time::Duration::from_millis(50), inbound.next()).await;
        assert!(next.is_err(), "no reply expected");
    }
}
