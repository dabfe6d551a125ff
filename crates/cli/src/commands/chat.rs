//! `pipeclaw chat` — Interactive or single-message chat mode.

use std::io::Write;
use std::sync::Arc;

use pipeclaw_agent::{AgentLoop, IgnoreReason, Session, TurnOutcome};
use pipeclaw_config::AppConfig;
use pipeclaw_core::tool::ToolExecutor;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::presenter::ConsolePresenter;

const EXIT_COMMANDS: [&str; 5] = ["exit", "quit", "/exit", "/quit", ":q"];

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let session = match build_session(&config) {
        Ok(session) => Arc::new(session),
        Err(e) => {
            eprintln!();
            eprintln!("  ERROR: {e}");
            eprintln!();
            eprintln!("  Either use the offline responder:");
            eprintln!("    PIPECLAW_RESPONDER=simulated");
            eprintln!();
            eprintln!("  or provide an API key for openai_compat:");
            eprintln!("    PIPECLAW_API_KEY=sk-...   (or OPENROUTER_API_KEY / OPENAI_API_KEY)");
            eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
            eprintln!();
            return Err(e);
        }
    };

    if let Some(msg) = message {
        // Single message mode
        return match session.submit_user_message(&msg).await {
            Ok(TurnOutcome::Ignored(IgnoreReason::Empty)) => Err("Message is empty".into()),
            Ok(_) => Ok(()),
            // Already reported by the presenter
            Err(_) => Err("Turn failed".into()),
        };
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        PipeClaw Agent — Interactive Mode     ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Responder: {}", config.responder.kind);
    if config.responder.kind == "openai_compat" {
        println!("  Model:     {}", config.responder.model);
    }
    println!("  Tools:     {}", tool_names(&config).join(", "));
    println!();
    println!("  Type your message and press Enter.");
    println!("  Ctrl+C cancels a running turn; type 'exit' to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        if is_exit_command(&line) {
            break;
        }

        let turn = session.submit_user_message(&line);
        tokio::pin!(turn);
        let outcome = loop {
            tokio::select! {
                outcome = &mut turn => break outcome,
                _ = tokio::signal::ctrl_c() => {
                    if session.cancel_turn() {
                        eprintln!("  (cancelling...)");
                    }
                }
            }
        };

        match outcome {
            Ok(TurnOutcome::Ignored(reason)) => debug!(?reason, "Submission ignored"),
            Ok(TurnOutcome::Completed(summary)) => {
                debug!(
                    model_steps = summary.model_steps,
                    tool_calls = summary.tool_calls_made,
                    "Turn finished"
                );
            }
            // Errors are printed by the presenter; keep chatting.
            Err(_) => {}
        }
        println!();
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}

/// Wire config, tools, responder and presenter into a session.
fn build_session(config: &AppConfig) -> Result<Session, Box<dyn std::error::Error>> {
    let registry = Arc::new(pipeclaw_tools::default_registry(&config.tools));
    let responder = pipeclaw_providers::build_from_config(config, registry.definitions())?;
    let agent = AgentLoop::from_config(responder, registry, &config.agent);
    Ok(Session::new(agent, Arc::new(ConsolePresenter)))
}

fn tool_names(config: &AppConfig) -> Vec<String> {
    pipeclaw_tools::default_registry(&config.tools)
        .names()
        .into_iter()
        .map(String::from)
        .collect()
}

pub fn is_exit_command(line: &str) -> bool {
    let line = line.trim();
    EXIT_COMMANDS.iter().any(|cmd| line.eq_ignore_ascii_case(cmd))
}
