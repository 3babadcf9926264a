//! MCP (Model Context Protocol) client
//!
//! Connects to stdio MCP servers and exposes their tools through the
//! [`crate::tools::ToolServer`] trait.
//!
//! - `types`     -- protocol and JSON-RPC wire types
//! - `client`    -- transport-agnostic JSON-RPC 2.0 client
//! - `protocol`  -- typed lifecycle over the client
//! - `transport` -- `Transport` trait with stdio and fake implementations
//! - `server`    -- a connected server as a `ToolServer`

pub mod client;
pub mod protocol;
pub mod server;
pub mod transport;
pub mod types;

pub use server::McpToolServer;
