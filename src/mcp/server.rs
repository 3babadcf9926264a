//! A connected MCP server exposed as a [`ToolServer`]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::McpServerConfig;
use crate::error::Result;
use crate::mcp::client::{start_read_loop, JsonRpcClient};
use crate::mcp::protocol::{InitializedMcpProtocol, McpProtocol};
use crate::mcp::transport::stdio::StdioTransport;
use crate::mcp::transport::Transport;
use crate::mcp::types::{ClientCapabilities, Implementation};
use crate::tools::{ToolDescriptor, ToolOutput, ToolServer};

/// An initialized MCP session plus the tasks pumping its transport
#[derive(Debug)]
pub struct McpToolServer {
    name: String,
    session: InitializedMcpProtocol,
    cancellation: CancellationToken,
    // Keeps the child process alive for the lifetime of the session.
    _transport: Arc<dyn Transport>,
}

impl McpToolServer {
    /// Spawn the configured stdio server and perform the handshake
    ///
    /// # Errors
    ///
    /// Fails when the process cannot be spawned or the handshake does not
    /// complete within `request_timeout`.
    pub async fn connect(
        name: &str,
        config: &McpServerConfig,
        request_timeout: Duration,
    ) -> Result<Self> {
        tracing::info!(
            "Connecting MCP server '{}': {} {}",
            name,
            config.command,
            config.args.join(" ")
        );
        let transport = StdioTransport::spawn(&config.command, &config.args, &config.env, None)?;
        Self::from_transport(name, Arc::new(transport), request_timeout).await
    }

    /// Run the handshake over an existing transport
    pub async fn from_transport(
        name: &str,
        transport: Arc<dyn Transport>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let cancellation = CancellationToken::new();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        spawn_writer(Arc::clone(&transport), outbound_rx, cancellation.clone());
        spawn_reader(Arc::clone(&transport), inbound_tx, cancellation.clone());
        spawn_diagnostics(name, Arc::clone(&transport), cancellation.clone());

        let client =
            Arc::new(JsonRpcClient::new(name, outbound_tx).with_default_timeout(request_timeout));
        start_read_loop(inbound_rx, cancellation.clone(), Arc::clone(&client));

        let client_info = Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: Some("Local LLM chat client".to_string()),
        };

        let session = match McpProtocol::new(client)
            .initialize(client_info, ClientCapabilities::default())
            .await
        {
            Ok(session) => session,
            Err(e) => {
                cancellation.cancel();
                return Err(e);
            }
        };

        if session.initialize_response().capabilities.tools.is_none() {
            tracing::warn!("MCP server '{}' does not advertise tools", name);
        }

        Ok(Self {
            name: name.to_string(),
            session,
            cancellation,
            _transport: transport,
        })
    }
}

fn spawn_writer(
    transport: Arc<dyn Transport>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    cancellation: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancellation.cancelled() => break,
                msg = outbound_rx.recv() => {
                    let Some(msg) = msg else { break };
                    if let Err(e) = transport.send(msg).await {
                        tracing::warn!("MCP write failed: {}", e);
                        break;
                    }
                }
            }
        }
    });
}

fn spawn_reader(
    transport: Arc<dyn Transport>,
    inbound_tx: mpsc::UnboundedSender<String>,
    cancellation: CancellationToken,
) {
    tokio::spawn(async move {
        let mut inbound = transport.receive();
        loop {
            tokio::select! {
                _ = cancellation.cancelled() => break,
                msg = inbound.next() => {
                    let Some(msg) = msg else { break };
                    if inbound_tx.send(msg).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

fn spawn_diagnostics(name: &str, transport: Arc<dyn Transport>, cancellation: CancellationToken) {
    let name = name.to_string();
    tokio::spawn(async move {
        let mut diagnostics = transport.receive_err();
        loop {
            tokio::select! {
                _ = cancellation.cancelled() => break,
                line = diagnostics.next() => {
                    let Some(line) = line else { break };
                    tracing::debug!("MCP server '{}' stderr: {}", name, line);
                }
            }
        }
    });
}

#[async_trait]
impl ToolServer for McpToolServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let tools = self.session.list_tools().await?;
        Ok(tools
            .into_iter()
            .map(|tool| ToolDescriptor {
                description: tool
                    .description
                    .or(tool.title)
                    .unwrap_or_default(),
                name: tool.name,
                input_schema: tool.input_schema,
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<ToolOutput> {
        let response = self
            .session
            .call_tool(name, Some(Value::Object(arguments)))
            .await?;
        let is_error = response.is_error.unwrap_or(false);
        if is_error {
            tracing::warn!("Tool '{}' on '{}' reported an error", name, self.name);
        }
        Ok(ToolOutput {
            content: response.text_fragments(),
            is_error,
        })
    }

    async fn disconnect(&self) {
        tracing::info!("Disconnecting MCP server '{}'", self.name);
        self.cancellation.cancel();
    }
}

impl Drop for McpToolServer {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}
