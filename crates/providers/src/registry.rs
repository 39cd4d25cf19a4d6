//! Provider registry — resolves an agent's `ProviderKind` to a client.

use crate::{ChatProvider, OllamaProvider, ProxyProvider};
use metaloop_core::{ProviderError, ProviderKind};
use metaloop_config::AppConfig;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps provider kinds to their clients. Built once at startup, shared
/// read-only by the loop engine.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn ChatProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard wiring: Ollama direct, Groq through the backend proxy.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self::new();
        registry.register(
            ProviderKind::Ollama,
            Arc::new(OllamaProvider::new(&config.ollama_url)),
        );
        registry.register(
            ProviderKind::Groq,
            Arc::new(ProxyProvider::groq(&config.backend_url)),
        );
        registry
    }

    pub fn register(&mut self, kind: ProviderKind, provider: Arc<dyn ChatProvider>) {
        self.providers.insert(kind, provider);
    }

    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn ChatProvider>, ProviderError> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| ProviderError::NotConfigured(kind.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_registers_both_kinds() {
        let registry = ProviderRegistry::from_config(&AppConfig::default());
        assert_eq!(registry.get(ProviderKind::Ollama).unwrap().name(), "ollama");
        assert_eq!(registry.get(ProviderKind::Groq).unwrap().name(), "groq");
    }

    #[test]
    fn unknown_kind_is_not_configured() {
        let registry = ProviderRegistry::new();
        assert!(matches!(
            registry.get(ProviderKind::Ollama),
            Err(ProviderError::NotConfigured(_))
        ));
    }
}
