//! LocalChat - streaming chat library for local LLM servers
//!
//! This library provides the core of LocalChat: streamed replies from a
//! llama-server compatible endpoint, SQLite session persistence, and a
//! bounded agent loop that lets the model call tools on MCP servers.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `agent`: Conversation state, the streaming answer path, the tool loop and [`ChatService`]
//! - `inference`: Chat message types and the llama-server client
//! - `stream`: Delta batching and token statistics
//! - `tools`: Tool server abstraction, tool call detection and routing
//! - `mcp`: JSON-RPC client for stdio MCP servers
//! - `storage`: SQLite session and message store
//! - `events`: Notifications delivered to the UI
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use localchat::events::ChannelSink;
//! use localchat::inference::LlamaServerClient;
//! use localchat::storage::SqliteMessageStore;
//! use localchat::{ChatService, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let inference = Arc::new(LlamaServerClient::new(&config.inference)?);
//!     let store = Arc::new(SqliteMessageStore::new(&config.storage)?);
//!     let (sink, _events) = ChannelSink::new();
//!
//!     let service = ChatService::new(config, inference, store, Arc::new(sink));
//!     let session = service.new_chat("You are terse.")?;
//!     service.handle_chat(session, "hello").await?;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod inference;
pub mod mcp;
pub mod storage;
pub mod stream;
pub mod tools;

// Re-export commonly used types
pub use agent::ChatService;
pub use config::Config;
pub use error::{ChatError, Result};

#[cfg(test)]
pub mod test_utils;
