//! `metaloop history` — list saved loop conversations.

use metaloop_config::AppConfig;
use metaloop_engine::{HttpTranscriptStore, TranscriptStore};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = HttpTranscriptStore::new(&config.backend_url);

    match store.list().await {
        Ok(ids) if ids.is_empty() => println!("No saved loop conversations."),
        Ok(ids) => {
            for id in ids {
                println!("{id}");
            }
        }
        Err(err) => return Err(format!("Failed to list loop conversations: {err}").into()),
    }

    Ok(())
}
