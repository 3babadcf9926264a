use crate::cli::SessionCommand;
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::inference::Role;
use crate::storage::{MessageStore, SqliteMessageStore, StoredMessage};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle session commands against the configured history database
pub fn handle_sessions(command: SessionCommand, config: &Config) -> Result<()> {
    let store = SqliteMessageStore::new(&config.storage)?;
    run(command, &store)
}

fn run(command: SessionCommand, store: &dyn MessageStore) -> Result<()> {
    match command {
        SessionCommand::List => {
            let sessions = store.list_sessions()?;

            if sessions.is_empty() {
                println!("{}", "No chat sessions found.".yellow());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

            table.add_row(prettytable::row![
                "ID".bold(),
                "Name".bold(),
                "Messages".bold(),
                "Created".bold()
            ]);

            for session in sessions {
                let created = session
                    .created_at
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string();

                table.add_row(prettytable::row![
                    session.id.to_string().cyan(),
                    session.name,
                    session.message_count,
                    created
                ]);
            }

            println!("\nChat Sessions:");
            table.printstd();
            println!();
            println!(
                "Use {} to resume a session.",
                "localchat chat --session <ID>".cyan()
            );
            println!();
        }
        SessionCommand::Show { id } => {
            let session = store
                .get_session(id)?
                .ok_or(ChatError::SessionNotFound(id))?;

            println!("\n{} {}", session.name.bold(), format!("#{}", id).dimmed());
            if !session.system_prompt.is_empty() {
                println!("{} {}", "system:".dimmed(), session.system_prompt);
            }
            print_transcript(&store.get_messages(id)?);
        }
        SessionCommand::Delete { id } => {
            if store.get_session(id)?.is_none() {
                return Err(ChatError::SessionNotFound(id).into());
            }
            store.delete_session(id)?;
            println!("{}", format!("Deleted session {}", id).green());
        }
    }

    Ok(())
}

/// Print stored messages one per block, colored by role
pub fn print_transcript(messages: &[StoredMessage]) {
    for message in messages {
        let label = format!("{}:", message.role);
        let label = match message.role {
            Role::User => label.green().bold(),
            Role::Assistant => label.cyan().bold(),
            Role::Tool => label.magenta().bold(),
            Role::System => label.dimmed(),
        };
        println!("{} {}", label, message.content);
    }
    println!();
}
