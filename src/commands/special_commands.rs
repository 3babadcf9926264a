//! Special commands parser for interactive chat
//!
//! Commands are prefixed with `/`; the command word is case-insensitive,
//! arguments keep their case. `exit` and `quit` work without the slash.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Replace the session's system prompt
    SetSystemPrompt(String),

    /// Show the current system prompt
    ShowSystemPrompt,

    /// Print the tool manifest the model would see
    ShowTools,

    /// Connect a configured MCP server by name
    Connect(String),

    /// Disconnect a tool server by name
    Disconnect(String),

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; send the input to the model
    None,
}

fn required_arg(command: &str, usage: &str, rest: &str) -> Result<String, CommandError> {
    let arg = rest.trim();
    if arg.is_empty() {
        return Err(CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        });
    }
    Ok(arg.to_string())
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns [`CommandError::UnknownCommand`] for an unrecognised `/` command
/// and [`CommandError::MissingArgument`] when an argument is required.
///
/// # Examples
///
/// ```
/// use localchat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(
///     parse_special_command("/system You are terse.").unwrap(),
///     SpecialCommand::SetSystemPrompt("You are terse.".to_string())
/// );
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if lower == "exit" || lower == "quit" {
        return Ok(SpecialCommand::Exit);
    }
    if !trimmed.starts_with('/') {
        return Ok(SpecialCommand::None);
    }

    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word.to_lowercase(), rest),
        None => (lower.clone(), ""),
    };

    match word.as_str() {
        "/system" if rest.trim().is_empty() => Ok(SpecialCommand::ShowSystemPrompt),
        "/system" => Ok(SpecialCommand::SetSystemPrompt(rest.trim().to_string())),
        "/tools" => Ok(SpecialCommand::ShowTools),
        "/connect" => {
            required_arg("/connect", "/connect <server>", rest).map(SpecialCommand::Connect)
        }
        "/disconnect" => required_arg("/disconnect", "/disconnect <server>", rest)
            .map(SpecialCommand::Disconnect),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Print the interactive help text
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

  /system <text>      - Replace the system prompt of this session
  /system             - Show the current system prompt
  /tools              - Show the tool manifest sent to the model
  /connect <server>   - Connect a configured MCP server
  /disconnect <server> - Disconnect a tool server
  /help               - Show this help
  /exit, exit, quit   - Leave the session

Press Ctrl-C while a reply is streaming to stop it.
"#
    );
}
