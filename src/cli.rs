//! Command-line interface definition for LocalChat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, session management, tool
//! listing and inference server health checks.

use clap::{Parser, Subcommand};

/// LocalChat - streaming chat for local LLM servers
///
/// Talks to a llama-server compatible endpoint, persists sessions to
/// SQLite and lets the model call tools exposed by MCP servers.
#[derive(Parser, Debug, Clone)]
#[command(name = "localchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the chat history database path
    #[arg(long, env = "LOCALCHAT_HISTORY_DB")]
    pub storage_path: Option<String>,

    /// Override the inference server base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for LocalChat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Resume an existing session by id
        #[arg(short, long)]
        session: Option<i64>,

        /// System prompt for a new session
        #[arg(long)]
        system_prompt: Option<String>,
    },

    /// Manage stored chat sessions
    Sessions {
        /// Session management subcommand
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// List the tools advertised by the configured MCP servers
    Tools,

    /// Check that the inference server is up
    Health,
}

/// Session management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// List stored sessions
    List,

    /// Show the messages of a stored session
    Show {
        /// Session id
        id: i64,
    },

    /// Delete a stored session and its messages
    Delete {
        /// Session id
        id: i64,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
