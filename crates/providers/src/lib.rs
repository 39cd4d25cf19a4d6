//! LLM provider implementations for metaloop.
//!
//! All providers implement [`ChatProvider`]: one streaming chat call per
//! agent turn, delivered as a lazy sequence of accumulated-text snapshots.
//! The registry selects the correct provider per agent binding.

pub mod catalog;
pub mod ndjson;
pub mod ollama;
pub mod proxy;
pub mod registry;

pub use catalog::{ModelCatalog, ModelInfo};
pub use ollama::OllamaProvider;
pub use proxy::ProxyProvider;
pub use registry::ProviderRegistry;

use async_trait::async_trait;
use metaloop_core::{CancelToken, ChatMessage, ProviderError};
use tokio::sync::mpsc;

/// One streaming chat call. The client composes the wire history as
/// `[system, ...history, user(input)]` — rebuilt fresh per call.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub system_prompt: String,
    pub history: Vec<ChatMessage>,
    pub input: String,
    pub temperature: f32,
}

/// A snapshot of a streaming response.
///
/// `text` is always the **full accumulated text so far**, not a delta; each
/// snapshot is a prefix-extension of the previous one. The consumer renders
/// it directly without any reassembly.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamUpdate {
    pub text: String,
    pub done: bool,
}

/// A lazy, finite, non-restartable sequence of [`StreamUpdate`]s.
pub struct TokenStream {
    rx: mpsc::Receiver<Result<StreamUpdate, ProviderError>>,
}

impl TokenStream {
    pub fn new(rx: mpsc::Receiver<Result<StreamUpdate, ProviderError>>) -> Self {
        Self { rx }
    }

    /// The next snapshot, or `None` once the stream is exhausted.
    pub async fn next(&mut self) -> Option<Result<StreamUpdate, ProviderError>> {
        self.rx.recv().await
    }

    /// Drain the stream and return the final accumulated text.
    pub async fn collect(mut self) -> Result<String, ProviderError> {
        let mut text = String::new();
        while let Some(update) = self.next().await {
            let update = update?;
            text = update.text;
            if update.done {
                break;
            }
        }
        Ok(text)
    }
}

/// The core provider trait.
///
/// Every LLM backend (local Ollama, the unified cloud proxy) implements this;
/// the loop engine calls `stream()` without knowing which one it got.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama", "groq").
    fn name(&self) -> &str;

    /// Start a streaming chat completion.
    ///
    /// Fails fast (before any stream exists) on HTTP-level errors. Once a
    /// stream is returned, mid-flight failures and cancellation arrive as
    /// `Err` items on the stream itself.
    async fn stream(
        &self,
        request: ChatRequest,
        cancel: CancelToken,
    ) -> Result<TokenStream, ProviderError>;

    /// List the models this provider can serve.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collect_returns_final_snapshot() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(Ok(StreamUpdate { text: "He".into(), done: false }))
            .await
            .unwrap();
        tx.send(Ok(StreamUpdate { text: "Hello".into(), done: true }))
            .await
            .unwrap();
        drop(tx);

        let text = TokenStream::new(rx).collect().await.unwrap();
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn collect_surfaces_stream_errors() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(Ok(StreamUpdate { text: "part".into(), done: false }))
            .await
            .unwrap();
        tx.send(Err(ProviderError::Stream("connection reset".into())))
            .await
            .unwrap();
        drop(tx);

        let err = TokenStream::new(rx).collect().await.unwrap_err();
        assert!(matches!(err, ProviderError::Stream(_)));
    }

    #[tokio::test]
    async fn snapshots_are_prefix_extensions() {
        let (tx, rx) = mpsc::channel(8);
        let full = "design a birdhouse";
        for end in [6, 8, full.len()] {
            tx.send(Ok(StreamUpdate {
                text: full[..end].into(),
                done: end == full.len(),
            }))
            .await
            .unwrap();
        }
        drop(tx);

        let mut stream = TokenStream::new(rx);
        let mut previous = String::new();
        while let Some(update) = stream.next().await {
            let update = update.unwrap();
            assert!(update.text.starts_with(&previous));
            assert!(update.text.len() >= previous.len());
            previous = update.text;
        }
        assert_eq!(previous, full);
    }
}
