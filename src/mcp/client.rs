//! Transport-agnostic async JSON-RPC 2.0 client
//!
//! [`JsonRpcClient`] writes serialized requests to an outbound channel and
//! waits for responses resolved by [`start_read_loop`], which consumes the
//! inbound channel. In-flight requests live in a `pending` map keyed by
//! request id; each entry is a `oneshot::Sender` completed by the read loop.
//!
//! Server-initiated requests are answered with `-32601 Method not found`
//! (this client offers no sampling, roots or elicitation). Notifications are
//! logged and otherwise ignored.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{ChatError, Result};
use crate::mcp::types::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, METHOD_NOT_FOUND,
};

/// Timeout used when neither the caller nor the client specifies one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type PendingMap =
    HashMap<u64, oneshot::Sender<std::result::Result<serde_json::Value, JsonRpcError>>>;

/// Channel-backed JSON-RPC 2.0 client for one MCP server.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tokio::sync::mpsc;
/// use tokio_util::sync::CancellationToken;
/// use localchat::mcp::client::{start_read_loop, JsonRpcClient};
///
/// #[tokio::main]
/// async fn main() {
///     let (out_tx, _out_rx) = mpsc::unbounded_channel::<String>();
///     let (_in_tx, in_rx) = mpsc::unbounded_channel::<String>();
///     let client = Arc::new(JsonRpcClient::new("files", out_tx));
///     let _loop = start_read_loop(in_rx, CancellationToken::new(), Arc::clone(&client));
/// }
/// ```
pub struct JsonRpcClient {
    server: String,
    next_id: AtomicU64,
    pending: Mutex<PendingMap>,
    outbound_tx: mpsc::UnboundedSender<String>,
    default_timeout: Duration,
}

impl std::fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("server", &self.server)
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl JsonRpcClient {
    /// Create a client for the server named `server`.
    ///
    /// The caller wires `outbound_tx`'s receiver to a transport writer and
    /// starts [`start_read_loop`] with the matching inbound receiver.
    pub fn new(server: impl Into<String>, outbound_tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            server: server.into(),
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            outbound_tx,
            default_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the timeout used by requests that do not pass their own.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Name of the server this client talks to.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Send a request and await the typed result.
    ///
    /// # Errors
    ///
    /// - [`ChatError::McpTransport`] if the outbound channel is closed or the
    ///   read loop stops before a response arrives
    /// - [`ChatError::McpTimeout`] if no response arrives in time
    /// - [`ChatError::Mcp`] if the server answers with an error object
    /// - [`ChatError::Serialization`] if the result does not match `R`
    pub async fn request<P, R>(
        &self,
        method: &str,
        params: P,
        timeout: Option<Duration>,
    ) -> Result<R>
    where
        P: serde::Serialize + Send,
        R: serde::de::DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        // Register before sending so a fast response cannot be missed.
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let message = serde_json::to_string(&JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(serde_json::json!(id)),
            method: method.to_string(),
            params: Some(serde_json::to_value(params)?),
        })?;

        if self.outbound_tx.send(message).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(ChatError::McpTransport("outbound channel closed".to_string()).into());
        }

        let deadline = timeout.unwrap_or(self.default_timeout);
        let outcome = match tokio::time::timeout(deadline, rx).await {
            Ok(outcome) => outcome,
            Err(_) => {
                self.pending.lock().await.remove(&id);
                tracing::warn!(
                    "MCP request '{}' to '{}' timed out after {:?}",
                    method,
                    self.server,
                    deadline
                );
                return Err(ChatError::McpTimeout {
                    server: self.server.clone(),
                    method: method.to_string(),
                }
                .into());
            }
        };

        let rpc_result = outcome.map_err(|_| {
            ChatError::McpTransport("read loop exited before response arrived".to_string())
        })?;
        let value = rpc_result.map_err(|e| ChatError::Mcp(e.to_string()))?;

        serde_json::from_value(value).map_err(|e| ChatError::Serialization(e).into())
    }

    /// Send a notification; the server never replies.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::McpTransport`] if the outbound channel is closed.
    pub fn notify<P: serde::Serialize + Send>(&self, method: &str, params: P) -> Result<()> {
        let message = serde_json::to_string(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": serde_json::to_value(params)?
        }))?;

        self.outbound_tx
            .send(message)
            .map_err(|_| ChatError::McpTransport("outbound channel closed".to_string()))?;
        Ok(())
    }

    async fn fail_pending(&self) {
        // Dropping the senders wakes every waiting caller with an error.
        self.pending.lock().await.clear();
    }
}

/// Run the read loop as a background task.
///
/// Stops when `cancellation` fires or the inbound channel closes; in both
/// cases every pending request fails immediately instead of waiting for its
/// timeout.
pub fn start_read_loop(
    mut inbound_rx: mpsc::UnboundedReceiver<String>,
    cancellation: CancellationToken,
    client: Arc<JsonRpcClient>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => break,

                maybe_msg = inbound_rx.recv() => match maybe_msg {
                    Some(raw) => dispatch_message(&raw, &client).await,
                    None => {
                        tracing::debug!("MCP server '{}' closed its output", client.server);
                        break;
                    }
                },
            }
        }
        client.fail_pending().await;
    })
}

async fn dispatch_message(raw: &str, client: &JsonRpcClient) {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(
                "MCP server '{}' sent unparseable JSON: {}",
                client.server,
                e
            );
            return;
        }
    };

    let has_id = value.get("id").map(|id| !id.is_null()).unwrap_or(false);
    let has_method = value.get("method").is_some();
    let is_response = value.get("result").is_some() || value.get("error").is_some();

    if has_id && is_response && !has_method {
        handle_response(value, client).await;
    } else if has_id && has_method {
        reject_server_request(value, client);
    } else if has_method {
        tracing::debug!(
            "MCP server '{}' notification: {}",
            client.server,
            value["method"]
        );
    } else {
        tracing::debug!(
            "MCP server '{}' sent an unclassifiable message; ignoring",
            client.server
        );
    }
}

async fn handle_response(value: serde_json::Value, client: &JsonRpcClient) {
    let id_val = &value["id"];
    let id = match id_val
        .as_u64()
        .or_else(|| id_val.as_str().and_then(|s| s.parse().ok()))
    {
        Some(id) => id,
        None => {
            tracing::warn!("MCP response has non-integer id: {}", id_val);
            return;
        }
    };

    let Some(tx) = client.pending.lock().await.remove(&id) else {
        tracing::debug!("MCP response for unknown id {}; ignoring", id);
        return;
    };

    let outcome = match value.get("error") {
        Some(error_val) => Err(serde_json::from_value::<JsonRpcError>(error_val.clone())
            .unwrap_or_else(|_| JsonRpcError {
                code: INTERNAL_ERROR,
                message: format!("malformed error object: {}", error_val),
                data: None,
            })),
        None => Ok(value
            .get("result")
            .cloned()
            .unwrap_or(serde_json::Value::Null)),
    };

    // The caller may already have timed out.
    let _ = tx.send(outcome);
}

fn reject_server_request(value: serde_json::Value, client: &JsonRpcClient) {
    let method = value["method"].as_str().unwrap_or_default().to_string();
    let id = value.get("id").cloned().unwrap_or(serde_json::Value::Null);
    tracing::debug!(
        "MCP server '{}' sent unsupported request '{}'",
        client.server,
        method
    );

    let response =
        JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", method));
    if let Ok(serialized) = serde_json::to_string(&response) {
        let _ = client.outbound_tx.send(serialized);
    }
}
