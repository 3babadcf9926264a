/*!
Command handlers for the CLI

- `chat`: Interactive streaming chat
- `sessions`: Stored session listing, inspection and deletion
- `tools`: Tools advertised by the configured MCP servers
- `health`: Inference server health check
*/

use crate::agent::ChatService;
use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
use crate::config::Config;
use crate::error::Result;
use crate::events::{ChannelSink, ChatEvent};
use crate::inference::LlamaServerClient;
use crate::storage::SqliteMessageStore;
use colored::Colorize;
use std::io::Write;
use std::sync::Arc;

// Special commands parser for the chat loop
pub mod special_commands;

// Stored session management
pub mod sessions;

// MCP tool listing
pub mod tools;

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Builds a [`ChatService`] over the configured inference server and
    //! history database, then runs a readline loop. Replies are printed as
    //! batches arrive; Ctrl-C while a reply streams stops it.

    use super::*;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `session` - Stored session to resume; a new one is created if `None`
    /// * `system_prompt` - System prompt for a new session, or a replacement
    ///   for a resumed one
    pub async fn run_chat(
        config: Config,
        session: Option<i64>,
        system_prompt: Option<String>,
    ) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let inference = Arc::new(LlamaServerClient::new(&config.inference)?);
        let store = Arc::new(SqliteMessageStore::new(&config.storage)?);
        let (sink, mut events) = ChannelSink::new();
        let service = Arc::new(ChatService::new(config, inference, store, Arc::new(sink)));

        let connected = service.auto_connect_servers().await;

        let session_id = match session {
            Some(id) => {
                let history = service.load_chat_history(id)?;
                if let Some(prompt) = &system_prompt {
                    service.update_system_prompt(id, prompt)?;
                }
                sessions::print_transcript(&history);
                id
            }
            None => service.new_chat(system_prompt.as_deref().unwrap_or_default())?,
        };

        print_welcome_banner(session_id, &connected);

        let mut rl = DefaultEditor::new()?;
        loop {
            match rl.readline(&format!("{} ", "You>".green().bold())) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::None) => {}
                        Ok(SpecialCommand::Exit) => break,
                        Ok(command) => {
                            handle_special_command(&service, session_id, command).await;
                            continue;
                        }
                        Err(e) => {
                            println!("{}", e.to_string().red());
                            continue;
                        }
                    }

                    rl.add_history_entry(trimmed)?;
                    send_message(&service, session_id, trimmed, &mut events).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("Use /exit to leave the session");
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    tracing::error!("Readline error: {}", e);
                    break;
                }
            }
        }

        service.shutdown().await;
        println!("Goodbye!");
        Ok(())
    }

    /// Run one request and render its events until it completes
    async fn send_message(
        service: &Arc<ChatService>,
        session_id: i64,
        message: &str,
        events: &mut UnboundedReceiver<ChatEvent>,
    ) {
        let mut request = {
            let service = Arc::clone(service);
            let message = message.to_string();
            tokio::spawn(async move { service.handle_chat(session_id, &message).await })
        };

        print!("{} ", "Assistant>".cyan().bold());
        let _ = std::io::stdout().flush();

        loop {
            tokio::select! {
                Some(event) = events.recv() => render_event(&event),
                _ = tokio::signal::ctrl_c() => {
                    if service.stop_stream(session_id) {
                        println!("{}", " [stopped]".yellow());
                    }
                }
                result = &mut request => {
                    while let Ok(event) = events.try_recv() {
                        render_event(&event);
                    }
                    match result {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => tracing::debug!("Chat request failed: {}", e),
                        Err(e) => tracing::error!("Chat task panicked: {}", e),
                    }
                    break;
                }
            }
        }
    }

    /// Print one UI event to the terminal
    pub fn render_event(event: &ChatEvent) {
        match event {
            ChatEvent::StreamChunk { text, .. } => {
                print!("{}", text);
                let _ = std::io::stdout().flush();
            }
            ChatEvent::StreamEnd { .. } => println!(),
            ChatEvent::ToolResult {
                tool_name, content, ..
            } => {
                let name = tool_name.as_deref().unwrap_or("tool");
                println!("\n{} {}", format!("[{}]", name).magenta(), content.dimmed());
            }
            ChatEvent::SessionNameUpdated { new_name, .. } => {
                tracing::debug!("Session renamed to '{}'", new_name);
            }
            ChatEvent::TokenStats {
                tokens,
                tokens_per_second,
                session_total,
                ..
            } => {
                println!(
                    "{}",
                    format!(
                        "({} tokens, {:.1} tok/s, {} this session)",
                        tokens, tokens_per_second, session_total
                    )
                    .dimmed()
                );
            }
            ChatEvent::Error { message, .. } => {
                println!("\n{} {}", "Error:".red().bold(), message.red());
            }
        }
    }

    async fn handle_special_command(
        service: &ChatService,
        session_id: i64,
        command: SpecialCommand,
    ) {
        match command {
            SpecialCommand::SetSystemPrompt(prompt) => {
                match service.update_system_prompt(session_id, &prompt) {
                    Ok(()) => println!("{}", "System prompt updated".green()),
                    Err(e) => println!("{}", e.to_string().red()),
                }
            }
            SpecialCommand::ShowSystemPrompt => {
                let prompt = service.system_prompt(session_id).unwrap_or_default();
                if prompt.is_empty() {
                    println!("{}", "No system prompt set".yellow());
                } else {
                    println!("{}", prompt);
                }
            }
            SpecialCommand::ShowTools => {
                if service.connected_tool_servers().await.is_empty() {
                    println!("{}", "No tool servers connected".yellow());
                } else {
                    println!("{}", service.tool_manifest().await);
                }
            }
            SpecialCommand::Connect(name) => {
                let Some(server) = service.config().mcp.servers.get(&name).cloned() else {
                    println!("{}", format!("No MCP server named '{}' in config", name).red());
                    return;
                };
                match service.connect_mcp_server(&name, &server).await {
                    Ok(()) => println!("{}", format!("Connected '{}'", name).green()),
                    Err(e) => println!("{}", e.to_string().red()),
                }
            }
            SpecialCommand::Disconnect(name) => {
                if service.disconnect_tool_server(&name).await {
                    println!("{}", format!("Disconnected '{}'", name).green());
                } else {
                    println!("{}", format!("'{}' is not connected", name).yellow());
                }
            }
            SpecialCommand::Help => print_help(),
            SpecialCommand::Exit | SpecialCommand::None => {}
        }
    }

    fn print_welcome_banner(session_id: i64, connected: &[String]) {
        println!();
        println!("{}", "LocalChat".bold());
        println!("Session {}", session_id.to_string().cyan());
        if connected.is_empty() {
            println!("Tools: {}", "none".dimmed());
        } else {
            println!("Tools: {}", connected.join(", ").cyan());
        }
        println!("Type {} for commands.\n", "/help".cyan());
    }
}

// Health check command handler
pub mod health {
    //! Inference server health check.

    use super::*;

    /// Query `{base_url}/health` and print the reported status
    ///
    /// # Errors
    ///
    /// Returns the transport or payload error when the check fails.
    pub async fn run_health(config: &Config) -> Result<()> {
        let client = LlamaServerClient::new(&config.inference)?;
        let status = client.health().await?;
        if status == "ok" {
            println!("{} {}", client.base_url(), status.green());
        } else {
            println!("{} {}", client.base_url(), status.yellow());
        }
        Ok(())
    }
}
