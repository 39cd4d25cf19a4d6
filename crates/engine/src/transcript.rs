//! Loop conversation persistence.
//!
//! A finished loop is written to the backend once, keyed by its start-of-save
//! timestamp. Saving is best-effort: the engine logs a failure and the run is
//! still considered successful.

use async_trait::async_trait;
use metaloop_core::{Transcript, TranscriptError};
use tracing::debug;

/// Persistence of finished loop conversations.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Persist a finished transcript.
    async fn save(&self, transcript: &Transcript) -> Result<(), TranscriptError>;

    /// List stored conversation ids for history browsing.
    async fn list(&self) -> Result<Vec<String>, TranscriptError>;
}

/// The backend-HTTP implementation.
pub struct HttpTranscriptStore {
    client: reqwest::Client,
    backend_url: String,
}

impl HttpTranscriptStore {
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
}

#[async_trait]
impl TranscriptStore for HttpTranscriptStore {
    async fn save(&self, transcript: &Transcript) -> Result<(), TranscriptError> {
        let url = format!(
            "{}/loop_conversations/{}",
            self.backend_url,
            transcript.timestamp.timestamp_millis()
        );

        let response = self
            .client
            .post(&url)
            .json(transcript)
            .send()
            .await
            .map_err(|e| TranscriptError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let message = response.text().await.unwrap_or_default();
            return Err(TranscriptError::Http {
                status_code: status,
                message,
            });
        }

        debug!(messages = transcript.messages.len(), "Saved loop conversation");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, TranscriptError> {
        let url = format!("{}/loop_conversations", self.backend_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TranscriptError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let message = response.text().await.unwrap_or_default();
            return Err(TranscriptError::Http {
                status_code: status,
                message,
            });
        }

        let entries: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| TranscriptError::Decode(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(|entry| match entry.as_str() {
                Some(id) => id.to_string(),
                None => entry.to_string(),
            })
            .collect())
    }
}
