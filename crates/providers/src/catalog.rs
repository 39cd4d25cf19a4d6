//! Model catalog — lists available models per provider via the backend.
//!
//! The backend answers `GET /api/models/{provider}` with an array of model
//! descriptors. Ollama entries carry a `name`, Groq entries an `id`; a
//! listing failure degrades to an empty list so pickers render empty rather
//! than erroring.

use metaloop_core::ProviderKind;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A model descriptor as returned by the backend. Extra fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ModelInfo {
    /// The display/selection label: `name` when present, else `id`.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or_default()
    }
}

/// Fetches model listings from the unified backend.
pub struct ModelCatalog {
    client: reqwest::Client,
    backend_url: String,
}

impl ModelCatalog {
    pub fn new(backend_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            backend_url: backend_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// List models for `provider`. Failures are logged and yield an empty
    /// list.
    pub async fn models(&self, provider: ProviderKind) -> Vec<ModelInfo> {
        let url = format!("{}/models/{}", self.backend_url, provider);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(provider = %provider, error = %err, "Model listing failed");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            warn!(provider = %provider, status = response.status().as_u16(), "Model listing failed");
            return Vec::new();
        }

        match response.json::<Vec<ModelInfo>>().await {
            Ok(models) => models,
            Err(err) => {
                warn!(provider = %provider, error = %err, "Model listing returned unexpected shape");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_prefers_name() {
        let model = ModelInfo {
            id: Some("abc".into()),
            name: Some("llama3:latest".into()),
        };
        assert_eq!(model.label(), "llama3:latest");
    }

    #[test]
    fn label_falls_back_to_id() {
        let model = ModelInfo {
            id: Some("llama-3.1-70b-versatile".into()),
            name: None,
        };
        assert_eq!(model.label(), "llama-3.1-70b-versatile");
    }

    #[test]
    fn descriptor_ignores_extra_fields() {
        let model: ModelInfo = serde_json::from_str(
            r#"{"name":"llama3","modified_at":"2026-01-01T00:00:00Z","size":123}"#,
        )
        .unwrap();
        assert_eq!(model.label(), "llama3");
    }
}
