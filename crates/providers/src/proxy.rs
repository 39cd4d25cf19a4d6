//! Unified-backend proxy provider — the route cloud models take.
//!
//! The backend exposes `POST /api/chat_agent` which forwards to the named
//! provider and answers with the complete response text. No token streaming
//! exists on this path, so the "stream" is a single snapshot followed by
//! done — consumers see the same contract either way.

use crate::{ChatProvider, ChatRequest, ModelInfo, StreamUpdate, TokenStream};
use async_trait::async_trait;
use metaloop_core::{CancelToken, ProviderError, ProviderKind};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A provider that relays chat calls through the unified backend API.
pub struct ProxyProvider {
    client: reqwest::Client,
    backend_url: String,
    kind: ProviderKind,
}

impl ProxyProvider {
    pub fn new(backend_url: impl Into<String>, kind: ProviderKind) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            backend_url: backend_url.into().trim_end_matches('/').to_string(),
            kind,
        }
    }

    /// Convenience constructor for the Groq route.
    pub fn groq(backend_url: impl Into<String>) -> Self {
        Self::new(backend_url, ProviderKind::Groq)
    }
}

#[derive(Debug, Deserialize)]
struct ProxyResponse {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl ChatProvider for ProxyProvider {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    async fn stream(
        &self,
        request: ChatRequest,
        cancel: CancelToken,
    ) -> Result<TokenStream, ProviderError> {
        let url = format!("{}/chat_agent", self.backend_url);
        let payload = serde_json::json!({
            "provider": self.kind,
            "model": request.model,
            "input": request.input,
            "history": request.history,
            "systemPrompt": request.system_prompt,
            "temperature": request.temperature,
        });

        debug!(provider = %self.kind, model = %request.model, "Sending proxied chat request");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            result = self.client.post(&url).json(&payload).send() => {
                result.map_err(|e| ProviderError::Network(e.to_string()))?
            }
        };

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Backend proxy returned error");
            return Err(ProviderError::Api {
                status_code: status,
                message: error_body,
            });
        }

        let parsed: ProxyResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        // The whole response arrives at once; deliver it as one final
        // snapshot so downstream code is stream-shape agnostic.
        let (tx, rx) = mpsc::channel(1);
        let _ = tx
            .send(Ok(StreamUpdate {
                text: parsed.response,
                done: true,
            }))
            .await;

        Ok(TokenStream::new(rx))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = format!("{}/models/{}", self.backend_url, self.kind);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Api {
                status_code: response.status().as_u16(),
                message: "Failed to list models".into(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groq_constructor() {
        let provider = ProxyProvider::groq("http://localhost:8000/api/");
        assert_eq!(provider.name(), "groq");
        assert_eq!(provider.backend_url, "http://localhost:8000/api");
    }

    #[test]
    fn proxy_response_tolerates_missing_field() {
        let parsed: ProxyResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.response.is_empty());

        let parsed: ProxyResponse =
            serde_json::from_str(r#"{"response":"hello","tokens":12}"#).unwrap();
        assert_eq!(parsed.response, "hello");
    }

    #[tokio::test]
    async fn stream_rejects_when_already_cancelled() {
        let provider = ProxyProvider::groq("http://localhost:8000/api");
        let cancel = CancelToken::new();
        cancel.cancel();

        let request = ChatRequest {
            model: "llama-3.1-70b-versatile".into(),
            system_prompt: String::new(),
            history: vec![],
            input: "hi".into(),
            temperature: 0.7,
        };

        let err = provider.stream(request, cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
