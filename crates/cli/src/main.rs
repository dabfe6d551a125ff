//! PipeClaw CLI — the main entry point.
//!
//! Commands:
//! - `chat`     — Interactive chat or single-message mode
//! - `onboard`  — Write a default config
//! - `doctor`   — Diagnose setup
//! - `tools`    — Print the tool definitions

use clap::{Parser, Subcommand};

mod commands;
mod presenter;

#[derive(Parser)]
#[command(
    name = "pipeclaw",
    about = "PipeClaw — a conversational agent with search, workflow and JavaScript tools",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Initialize configuration
    Onboard,

    /// Diagnose configuration, responder and JavaScript runtime
    Doctor,

    /// Print the tool definitions advertised to the model
    Tools,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat { message } => commands::chat::run(message).await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Tools => commands::tools::run().await?,
    }

    Ok(())
}
