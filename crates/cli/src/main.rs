//! Clerk CLI: the main entry point.
//!
//! Commands:
//! - `gateway` : Start the HTTP server
//! - `agent`   : Interactive chat or single-message mode
//! - `config`  : Print the effective configuration

use clap::{Parser, Subcommand};
use clerk_config::AppConfig;
use std::path::PathBuf;

mod commands;
mod logging;

#[derive(Parser)]
#[command(
    name = "clerk",
    about = "Clerk: a tool-calling order and product assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (default: ./clerk.toml)
    #[arg(short, long, global = true, env = "CLERK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the agent from the terminal
    Agent {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Continue an existing conversation
        #[arg(long)]
        conversation: Option<String>,
    },

    /// Print the effective configuration (API key redacted)
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())
        .map_err(|e| format!("Failed to load config: {e}"))?;

    if let Commands::Config = cli.command {
        commands::config_cmd::show(&config);
        return Ok(());
    }

    // Keep the guard alive so buffered log lines are flushed on exit.
    let _log_guard = logging::init(&config.logging, cli.verbose)?;
    tracing::debug!(config = ?config, "Configuration loaded");

    match cli.command {
        Commands::Gateway { port } => commands::gateway::run(config, port).await?,
        Commands::Agent {
            message,
            conversation,
        } => commands::agent::run(config, message, conversation).await?,
        Commands::Config => {}
    }

    Ok(())
}
