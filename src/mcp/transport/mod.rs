//! MCP transport abstraction
//!
//! - [`stdio::StdioTransport`] spawns a child process and exchanges
//!   newline-delimited JSON over its stdin/stdout.
//! - [`fake::FakeTransport`] is an in-process scripted server (tests only).
//!
//! Callers `send` one serialized JSON-RPC message at a time and `receive` a
//! stream of inbound messages. `receive_err` carries diagnostics such as a
//! child's stderr; those lines are never treated as errors.

use std::pin::Pin;

use futures::Stream;

use crate::error::Result;

/// A bidirectional channel to one MCP server.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send one complete JSON-RPC message; the transport adds any framing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ChatError::McpTransport`] if the peer is gone.
    async fn send(&self, message: String) -> Result<()>;

    /// Inbound messages, one complete JSON object per item.
    ///
    /// The stream ends when the peer disconnects.
    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>>;

    /// Diagnostic lines from the peer.
    fn receive_err(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>>;
}

pub mod stdio;

#[cfg(test)]
pub mod fake;
