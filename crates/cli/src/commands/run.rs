//! `metaloop run` — drive a conversation loop from the terminal.

use clap::{Args, ValueEnum};
use metaloop_config::AppConfig;
use metaloop_core::{ProcessGraph, ProviderKind};
use metaloop_engine::{
    AgentRoster, HttpTranscriptStore, LoopEvent, LoopRunner, LoopSettings, LoopStatus,
};
use metaloop_memory::{HttpMemoryStore, ReflectorSession};
use metaloop_providers::ProviderRegistry;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Graph-driven A↔B loop
    Standard,
    /// Fixed A→R→B→R self-evolving reflector pattern
    Reflector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderArg {
    Ollama,
    Groq,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Ollama => ProviderKind::Ollama,
            ProviderArg::Groq => ProviderKind::Groq,
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Seed prompt: the topic, question, or scenario for the agents
    #[arg(short, long)]
    pub seed: String,

    /// Loop mode
    #[arg(long, value_enum, default_value_t = Mode::Standard)]
    pub mode: Mode,

    /// Model for Agent A (overrides config)
    #[arg(long)]
    pub model_a: Option<String>,

    /// Model for Agent B (overrides config)
    #[arg(long)]
    pub model_b: Option<String>,

    /// Provider for Agent A
    #[arg(long, value_enum)]
    pub provider_a: Option<ProviderArg>,

    /// Provider for Agent B
    #[arg(long, value_enum)]
    pub provider_b: Option<ProviderArg>,

    /// Stop after this many steps
    #[arg(long)]
    pub max_steps: Option<u32>,

    /// Run without a step limit (stop with Ctrl-C)
    #[arg(long)]
    pub endless: bool,

    /// Load a custom process graph from a JSON file (standard mode only)
    #[arg(long)]
    pub graph: Option<PathBuf>,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    debug!(backend_url = %config.backend_url, ollama_url = %config.ollama_url, "Configuration loaded");

    let mut roster = AgentRoster::from_config(&config);
    if let Some(model) = args.model_a {
        roster.model_a = model;
    }
    if let Some(model) = args.model_b {
        roster.model_b = model;
    }
    if let Some(provider) = args.provider_a {
        roster.provider_a = provider.into();
    }
    if let Some(provider) = args.provider_b {
        roster.provider_b = provider.into();
    }

    if roster.model_a.is_empty() || roster.model_b.is_empty() {
        return Err(
            "Both models must be set: pass --model-a/--model-b or configure [agents] in config.toml"
                .into(),
        );
    }

    let graph = match (args.mode, &args.graph) {
        (Mode::Reflector, _) => ProcessGraph::reflector(),
        (Mode::Standard, Some(path)) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read graph file {}: {e}", path.display()))?;
            serde_json::from_str(&raw)
                .map_err(|e| format!("Failed to parse graph file {}: {e}", path.display()))?
        }
        (Mode::Standard, None) => ProcessGraph::standard(),
    };

    let settings = LoopSettings {
        max_steps: args.max_steps.unwrap_or(config.loop_defaults.max_steps),
        endless: args.endless || config.loop_defaults.endless,
        temperature: config.loop_defaults.temperature,
    };

    let registry = Arc::new(ProviderRegistry::from_config(&config));
    let transcripts = Arc::new(HttpTranscriptStore::new(&config.backend_url));
    let (events_tx, events_rx) = mpsc::channel(256);

    let runner = LoopRunner::new(graph, roster, registry, transcripts, events_tx)
        .map_err(|e| format!("Invalid process graph: {e}"))?
        .with_settings(settings);

    // Ctrl-C maps to the cooperative cancellation token.
    let cancel = runner.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!();
            eprintln!("  Stopping loop...");
            cancel.cancel();
        }
    });

    let printer = tokio::spawn(print_events(events_rx));

    let seed = args.seed;
    let outcome = match args.mode {
        Mode::Standard => runner.run_standard(&seed).await,
        Mode::Reflector => {
            let store = Arc::new(HttpMemoryStore::new(&config.backend_url));
            let mut session =
                ReflectorSession::load_or_fresh(store, &seed, &config.reflector.overall_goal).await;
            runner.run_reflector(&seed, &mut session).await
        }
    };

    // Dropping the runner closes the event channel so the printer drains out.
    drop(runner);
    printer.await?;

    let status = match outcome.status {
        LoopStatus::Completed => "completed",
        LoopStatus::Stopped => "stopped",
        LoopStatus::Errored => "errored",
        LoopStatus::Idle | LoopStatus::Running => "running",
    };
    println!();
    println!("  Loop {status}: {} steps, {} messages", outcome.steps, outcome.messages.len());

    Ok(())
}

/// Render loop events: stream suffixes as they arrive, one rule per turn.
async fn print_events(mut rx: mpsc::Receiver<LoopEvent>) {
    let mut printed_chars = 0usize;

    while let Some(event) = rx.recv().await {
        match event {
            LoopEvent::StepStarted { step, agent, model } => {
                println!();
                println!("──── step {} · {agent} ({model}) ────", step + 1);
                printed_chars = 0;
            }
            LoopEvent::StreamSnapshot { text, .. } => {
                // Snapshots carry the full text so far; print only the new
                // suffix.
                let chars: Vec<char> = text.chars().collect();
                if chars.len() > printed_chars {
                    let suffix: String = chars[printed_chars..].iter().collect();
                    print!("{suffix}");
                    let _ = std::io::stdout().flush();
                    printed_chars = chars.len();
                }
            }
            LoopEvent::Turn { message } => {
                if message.agent == "System" {
                    println!("  {}", message.text);
                } else {
                    println!();
                    if let Some(structured) = &message.structured {
                        println!();
                        println!(
                            "  [structured] {}",
                            serde_json::to_string(structured).unwrap_or_default()
                        );
                    }
                }
                printed_chars = 0;
            }
            LoopEvent::Error { message } => {
                eprintln!();
                eprintln!("  Error: {message}");
            }
            LoopEvent::Finished { .. } => {}
        }
    }
}
