//! `bravomind chat`: Interactive or single-message chat mode.

use bravomind_agent::{ResponseSource, TurnOrchestrator, TurnOutcome};
use bravomind_config::{AppConfig, CrisisResources};
use bravomind_core::message::{Conversation, Message};
use bravomind_safety::SafetyPipeline;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// Messages kept in the interactive session's memory.
const MAX_SESSION_MESSAGES: usize = 40;

pub async fn run(message: Option<String>, session: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let orchestrator = build_orchestrator(&config)?;
    let resources = orchestrator.pipeline().crisis_resources().clone();

    if !orchestrator.is_online() {
        eprintln!();
        eprintln!("  No API key configured; replies come from the offline responder.");
        eprintln!("  Set BRAVOMIND_API_KEY or NVIDIA_API_KEY, or add api_key to:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
    }

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let outcome = orchestrator.run_turn(&session, &msg, &[]).await;
        eprint!("\r              \r");
        print_outcome(&outcome, &resources);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        Bravo Mind — Your Battle Buddy        ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Generator: {}", if orchestrator.is_online() { config.provider.name.as_str() } else { "offline" });
    println!("  Model:     {}", config.generation.model);
    println!();
    println!("  In crisis? Call {} or text {}.", resources.hotline, resources.text_line);
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut conv = Conversation::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }
        if input.is_empty() {
            print!("  You > ");
            std::io::stdout().flush()?;
            continue;
        }

        eprint!("  ...");
        let history = conv.recent(config.max_history_messages);
        let outcome = orchestrator.run_turn(&session, input, history).await;
        eprint!("\r     \r");
        println!();
        print_outcome(&outcome, &resources);
        println!();

        // Rate-limit notices are not part of the conversation.
        if outcome.source != ResponseSource::RateLimited {
            conv.push(Message::user(input));
            conv.push(Message::assistant(&outcome.result.final_response));
            conv.truncate_front(MAX_SESSION_MESSAGES);
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Stay strong, battle buddy. 👋");
    println!();

    Ok(())
}

fn build_orchestrator(config: &AppConfig) -> Result<TurnOrchestrator, Box<dyn std::error::Error>> {
    let pipeline = Arc::new(SafetyPipeline::from_config(config)?);
    let provider = match bravomind_providers::build_from_config(config) {
        Ok(provider) => Some(provider),
        Err(e) => {
            warn!(error = %e, "Generator unavailable");
            None
        }
    };
    Ok(TurnOrchestrator::new(config, pipeline, provider))
}

fn print_outcome(outcome: &TurnOutcome, resources: &CrisisResources) {
    for line in outcome.result.final_response.lines() {
        println!("  Bravo > {line}");
    }
    if let Some(secs) = outcome.retry_after_secs {
        println!("  (next message accepted in about {secs}s)");
    }
    if outcome.result.recommendations.show_crisis_resources {
        println!();
        println!("  ┌─ {} ", outcome.result.crisis_severity.guidance());
        println!("  │ Veterans Crisis Line: {}", resources.hotline);
        println!("  │ Text:                 {}", resources.text_line);
        println!("  │ Emergency:            {}", resources.emergency);
        println!("  └─────────────────────────────────────────────");
    }
}
