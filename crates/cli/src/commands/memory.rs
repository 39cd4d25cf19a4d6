//! `metaloop memory` — inspect or reset the reflector memory document.

use clap::Subcommand;
use metaloop_config::AppConfig;
use metaloop_memory::{HttpMemoryStore, MemoryStore, ReflectorSession};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum MemoryAction {
    /// Print the stored document as pretty JSON
    Show,
    /// Overwrite with a fresh template (persisted before taking effect)
    Reset,
}

pub async fn run(action: MemoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = Arc::new(HttpMemoryStore::new(&config.backend_url));

    match action {
        MemoryAction::Show => match store.load().await {
            Some(memory) => println!("{}", serde_json::to_string_pretty(&memory)?),
            None => println!("No reflector memory stored (or the backend is unreachable)."),
        },
        MemoryAction::Reset => {
            let mut session =
                ReflectorSession::load_or_fresh(store, "", &config.reflector.overall_goal).await;
            if session.reset("", &config.reflector.overall_goal).await {
                println!("Reflector memory reset: {}", session.memory().session_id);
            } else {
                return Err("Reset was not persisted — is the backend running?".into());
            }
        }
    }

    Ok(())
}
