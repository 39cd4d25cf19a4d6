//! metaloop CLI — the main entry point.
//!
//! Commands:
//! - `run`     — Run a conversation loop (standard or reflector mode)
//! - `models`  — List available models per provider
//! - `history` — List saved loop conversations
//! - `memory`  — Show or reset the reflector memory

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "metaloop",
    about = "metaloop — multi-agent conversation loops over local and cloud LLMs",
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
    /// Run a conversation loop
    Run(commands::run::RunArgs),

    /// List available models per provider
    Models,

    /// List saved loop conversations
    History,

    /// Inspect or reset the reflector memory
    Memory {
        #[command(subcommand)]
        action: commands::memory::MemoryAction,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await?,
        Commands::Models => commands::models::run().await?,
        Commands::History => commands::history::run().await?,
        Commands::Memory { action } => commands::memory::run(action).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_command_parses() {
        let cli = Cli::try_parse_from([
            "metaloop",
            "run",
            "--seed",
            "design a birdhouse",
            "--model-a",
            "llama3",
            "--model-b",
            "mixtral",
            "--max-steps",
            "2",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.seed, "design a birdhouse");
                assert_eq!(args.model_a.as_deref(), Some("llama3"));
                assert_eq!(args.max_steps, Some(2));
                assert!(!args.endless);
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn memory_reset_parses() {
        let cli = Cli::try_parse_from(["metaloop", "memory", "reset"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Memory {
                action: commands::memory::MemoryAction::Reset
            }
        ));
    }
}
