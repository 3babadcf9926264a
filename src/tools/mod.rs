//! Tool servers and tool-call routing
//!
//! A [`ToolServer`] is anything that can list tools and execute them by
//! name; the production implementation is an MCP stdio server
//! ([`crate::mcp::McpToolServer`]). The [`router::ToolRouter`] decides
//! whether a request needs tools, renders the tool manifest for the system
//! prompt and executes tool calls emitted by the model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

pub mod call;
pub mod registry;
pub mod router;

pub use call::{detect_tool_call, ToolCall};
pub use registry::ToolServerRegistry;
pub use router::ToolRouter;

/// A tool advertised by a server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Name the model uses in `tool_name`
    pub name: String,
    /// Human-readable purpose
    pub description: String,
    /// JSON Schema of the `arguments` object
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// Whether the schema carries no information worth showing the model
    pub fn has_trivial_schema(&self) -> bool {
        match &self.input_schema {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

/// Output of a tool call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Text fragments in the order the server returned them
    pub content: Vec<String>,
    /// The server flagged the result as an error
    pub is_error: bool,
}

impl ToolOutput {
    /// Build a successful output from text fragments
    pub fn text<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            content: fragments.into_iter().map(Into::into).collect(),
            is_error: false,
        }
    }

    /// All text fragments concatenated without separators
    pub fn joined(&self) -> String {
        self.content.concat()
    }
}

/// A connected source of tools
#[async_trait]
pub trait ToolServer: Send + Sync {
    /// Name the server was registered under
    fn name(&self) -> &str;

    /// List the tools the server currently offers
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Execute a tool by name
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<ToolOutput>;

    /// Release the server's resources
    async fn disconnect(&self) {}
}
