//! `tools` subcommand handler
//!
//! Connects every MCP server in the configuration, prints the tools each
//! one advertises, then disconnects it again.

use crate::config::Config;
use crate::error::Result;
use crate::mcp::McpToolServer;
use crate::tools::ToolServer;
use colored::Colorize;
use prettytable::{format, Table};

/// List the tools of every configured MCP server
///
/// A server that fails to start or list its tools is reported and skipped.
pub async fn handle_tools(config: &Config) -> Result<()> {
    if config.mcp.servers.is_empty() {
        println!("{}", "No MCP servers configured.".yellow());
        return Ok(());
    }

    for (name, server_config) in &config.mcp.servers {
        match McpToolServer::connect(name, server_config, config.mcp.request_timeout()).await {
            Ok(server) => {
                print_server_tools(&server, &server_config.description).await;
                server.disconnect().await;
            }
            Err(e) => {
                println!("\n{} {}", name.bold(), format!("failed: {:#}", e).red());
            }
        }
    }
    println!();
    Ok(())
}

async fn print_server_tools(server: &dyn ToolServer, description: &str) {
    if description.is_empty() {
        println!("\n{}", server.name().bold());
    } else {
        println!("\n{} {}", server.name().bold(), description.dimmed());
    }

    let tools = match server.list_tools().await {
        Ok(tools) => tools,
        Err(e) => {
            println!("{}", format!("failed to list tools: {:#}", e).red());
            return;
        }
    };

    if tools.is_empty() {
        println!("{}", "no tools".dimmed());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row!["Tool".bold(), "Description".bold()]);
    for tool in tools {
        table.add_row(prettytable::row![tool.name.cyan(), tool.description]);
    }
    table.printstd();
}
