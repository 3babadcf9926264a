//! Error types for LocalChat
//!
//! This module defines the error taxonomy shared by the chat service, the
//! inference client, the tool router and the storage layer, using
//! `thiserror` for the typed variants and `anyhow` for propagation.

use thiserror::Error;

/// Main error type for LocalChat operations
///
/// Callers that need to react to a specific category (for example a tool
/// cooldown rejection) downcast the `anyhow::Error` back to this enum.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The inference server returned an unusable response
    #[error("Inference error: {0}")]
    Inference(String),

    /// The connection to the inference server failed or broke mid-stream
    #[error("Transport error: {0}")]
    Transport(String),

    /// A detected tool-call candidate was not valid JSON of the expected shape
    #[error("Failed to parse tool call: {0}")]
    ToolCallParse(String),

    /// The tool was invoked again before its cooldown window elapsed
    #[error("tool '{tool}' is on cooldown. Please wait {remaining_secs}s")]
    ToolCooldown {
        /// Name of the rate-limited tool
        tool: String,
        /// Whole seconds left in the cooldown window (rounded up)
        remaining_secs: u64,
    },

    /// No connected tool server advertises the requested tool
    #[error("tool '{0}' not found on any connected server")]
    ToolNotFound(String),

    /// The tool server accepted the call but failed to execute it
    #[error("failed to call tool {tool}: {message}")]
    ToolExecution {
        /// Name of the tool that failed
        tool: String,
        /// Failure reported by the server or transport
        message: String,
    },

    /// Agent loop exhausted its iteration cap
    #[error("Agent exceeded maximum iterations: limit={limit}, {message}")]
    MaxIterationsExceeded {
        /// The configured iteration cap
        limit: usize,
        /// Additional context about the failure
        message: String,
    },

    /// No in-memory conversation exists for the session id
    #[error("conversation not found: {0}")]
    ConversationNotFound(i64),

    /// No stored session exists for the session id
    #[error("session not found: {0}")]
    SessionNotFound(i64),

    /// A tool server with the same name is already connected
    #[error("tool server '{0}' is already connected")]
    AlreadyConnected(String),

    /// Chat history storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// MCP transport failure (process spawn, closed pipe, read loop exit)
    #[error("MCP transport error: {0}")]
    McpTransport(String),

    /// An MCP request did not receive a response in time
    #[error("MCP timeout: server={server}, method={method}")]
    McpTimeout {
        /// Name of the MCP server
        server: String,
        /// JSON-RPC method that timed out
        method: String,
    },

    /// The MCP server answered with a JSON-RPC error
    #[error("MCP error: {0}")]
    Mcp(String),

    /// The MCP server negotiated a protocol version this client cannot speak
    #[error("MCP protocol version mismatch: expected one of {expected:?}, got {got}")]
    McpProtocolVersion {
        /// Versions this client accepts
        expected: Vec<String>,
        /// Version the server selected
        got: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for LocalChat operations
pub type Result<T> = anyhow::Result<T>;
