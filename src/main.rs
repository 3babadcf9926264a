//! LocalChat - streaming chat CLI for local LLM servers
//!
#![doc = "LocalChat - streaming chat CLI for local LLM servers"]
#![doc = "Main entry point for the LocalChat application."]

use anyhow::Result;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use localchat::agent::metrics::init_metrics_exporter;
use localchat::cli::{Cli, Commands};
use localchat::commands;
use localchat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose, cli.json_logs);
    init_metrics_exporter();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Chat {
            session,
            system_prompt,
        } => {
            if let Some(id) = session {
                tracing::debug!("Resuming session: {}", id);
            }
            commands::chat::run_chat(config, session, system_prompt).await?;
            Ok(())
        }
        Commands::Sessions { command } => {
            tracing::info!("Starting sessions command");
            commands::sessions::handle_sessions(command, &config)?;
            Ok(())
        }
        Commands::Tools => {
            tracing::info!("Listing MCP tools");
            commands::tools::handle_tools(&config).await?;
            Ok(())
        }
        Commands::Health => {
            commands::health::run_health(&config).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so streamed replies on stdout stay clean.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose {
        "localchat=debug"
    } else {
        "localchat=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
