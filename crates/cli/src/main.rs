//! Bravo Mind CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Write the default config file
//! - `chat`: Interactive or single-message chat through the full turn pipeline
//! - `check`: Run the safety pipeline offline on a message and candidate reply
//! - `gateway`: Start the HTTP API server
//! - `config`: Show, validate, or locate the configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "bravomind",
    about = "Bravo Mind — AI battle buddy with a conversational safety pipeline",
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
    /// Write the default configuration file
    Onboard,

    /// Chat with your battle buddy
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Session key used for rate limiting
        #[arg(long, default_value = "cli")]
        session: String,
    },

    /// Run the safety pipeline on a message without calling the generator
    Check {
        /// The user message
        message: String,

        /// Candidate reply to gate (defaults to empty)
        #[arg(short, long)]
        candidate: Option<String>,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (API key redacted)
    Show,
    /// Load and validate the configuration
    Validate,
    /// Print the config file path
    Path,
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
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat { message, session } => commands::chat::run(message, session).await?,
        Commands::Check { message, candidate } => commands::check::run(message, candidate).await?,
        Commands::Gateway { port } => commands::gateway::run(port).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_check_with_candidate() {
        let cli = Cli::try_parse_from(["bravomind", "check", "hello", "--candidate", "hi there"])
            .unwrap();
        match cli.command {
            Commands::Check { message, candidate } => {
                assert_eq!(message, "hello");
                assert_eq!(candidate.as_deref(), Some("hi there"));
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn parses_global_verbose_after_subcommand() {
        let cli = Cli::try_parse_from(["bravomind", "chat", "-m", "hello", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Chat { message: Some(_), .. }));
    }

    #[test]
    fn parses_config_subcommands() {
        let cli = Cli::try_parse_from(["bravomind", "config", "validate"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config { action: ConfigAction::Validate }
        ));
    }
}
