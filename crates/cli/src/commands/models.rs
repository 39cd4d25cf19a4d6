//! `metaloop models` — list the models each provider can serve.

use metaloop_config::AppConfig;
use metaloop_core::ProviderKind;
use metaloop_providers::ModelCatalog;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let catalog = ModelCatalog::new(&config.backend_url);

    for provider in [ProviderKind::Ollama, ProviderKind::Groq] {
        let models = catalog.models(provider).await;
        println!("{provider} ({} models):", models.len());
        if models.is_empty() {
            println!("  (none — is the backend running?)");
        }
        for model in models {
            println!("  {}", model.label());
        }
        println!();
    }

    Ok(())
}
