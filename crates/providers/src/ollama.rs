//! Ollama provider — streaming chat against a local Ollama server.
//!
//! Issues a single `POST /api/chat` with `stream: true` and reads the body
//! incrementally as newline-delimited JSON. Every parsed chunk extends an
//! accumulator and emits the full text-so-far as a snapshot, which is the
//! contract the display layers rely on.

use crate::ndjson::{LineBuffer, parse_line};
use crate::{ChatProvider, ChatRequest, ModelInfo, StreamUpdate, TokenStream};
use async_trait::async_trait;
use futures::StreamExt;
use metaloop_core::{CancelToken, ChatMessage, ProviderError};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A provider backed by a local Ollama server.
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider against `base_url`
    /// (e.g. `http://localhost:11434`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn wire_messages(request: &ChatRequest) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(ChatMessage::system(&request.system_prompt));
        messages.extend(request.history.iter().cloned());
        messages.push(ChatMessage::user(&request.input));
        messages
    }
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn stream(
        &self,
        request: ChatRequest,
        cancel: CancelToken,
    ) -> Result<TokenStream, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = serde_json::json!({
            "model": request.model,
            "messages": Self::wire_messages(&request),
            "stream": true,
            "options": { "temperature": request.temperature },
        });

        debug!(model = %request.model, "Sending Ollama streaming request");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            result = self.client.post(&url).json(&body).send() => {
                result.map_err(|e| ProviderError::Network(e.to_string()))?
            }
        };

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Ollama returned error");
            return Err(ProviderError::Api {
                status_code: status,
                message: error_body,
            });
        }

        let (tx, rx) = mpsc::channel(64);

        // Read the byte stream on its own task; the consumer sees snapshots.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut lines = LineBuffer::new();
            let mut text = String::new();

            loop {
                let chunk = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        let _ = tx.send(Err(ProviderError::Cancelled)).await;
                        return;
                    }
                    chunk = byte_stream.next() => chunk,
                };

                let Some(chunk) = chunk else {
                    // Body ended without a done marker: flush the tail and
                    // resolve with whatever accumulated.
                    if let Some(tail) = lines.take_remainder() {
                        if let Some(parsed) = parse_line(&tail) {
                            text.push_str(parsed.delta());
                        }
                    }
                    let _ = tx.send(Ok(StreamUpdate { text, done: true })).await;
                    return;
                };

                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        let _ = tx.send(Err(ProviderError::Stream(err.to_string()))).await;
                        return;
                    }
                };

                for line in lines.push(&bytes) {
                    let Some(parsed) = parse_line(&line) else {
                        continue;
                    };

                    let delta = parsed.delta();
                    if !delta.is_empty() {
                        text.push_str(delta);
                        if !parsed.done
                            && tx
                                .send(Ok(StreamUpdate { text: text.clone(), done: false }))
                                .await
                                .is_err()
                        {
                            return; // receiver dropped
                        }
                    }

                    if parsed.done {
                        let _ = tx.send(Ok(StreamUpdate { text, done: true })).await;
                        return;
                    }
                }
            }
        });

        Ok(TokenStream::new(rx))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
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

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelInfo {
                id: None,
                name: Some(m.name),
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let provider = OllamaProvider::new("http://localhost:11434/");
        assert_eq!(provider.base_url, "http://localhost:11434");
    }

    #[test]
    fn wire_messages_compose_system_history_input() {
        let request = ChatRequest {
            model: "llama3".into(),
            system_prompt: "You are Agent A.".into(),
            history: vec![
                ChatMessage::user("earlier question"),
                ChatMessage::assistant("earlier answer"),
            ],
            input: "current input".into(),
            temperature: 0.7,
        };

        let messages = OllamaProvider::wire_messages(&request);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, metaloop_core::ChatRole::System);
        assert_eq!(messages[0].content, "You are Agent A.");
        assert_eq!(messages[3].role, metaloop_core::ChatRole::User);
        assert_eq!(messages[3].content, "current input");
    }

    #[tokio::test]
    async fn stream_rejects_when_already_cancelled() {
        let provider = OllamaProvider::new("http://localhost:11434");
        let cancel = CancelToken::new();
        cancel.cancel();

        let request = ChatRequest {
            model: "llama3".into(),
            system_prompt: String::new(),
            history: vec![],
            input: "hi".into(),
            temperature: 0.7,
        };

        let err = provider.stream(request, cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
