//! HTTP-backed reflector memory store.
//!
//! Thin GET/PUT wrappers around `{backend}/api/reflector_memory`. All
//! failures are caught and logged here so the loop never stops over a
//! persistence hiccup.

use crate::MemoryStore;
use async_trait::async_trait;
use metaloop_core::ReflectorMemory;
use tracing::{debug, warn};

pub struct HttpMemoryStore {
    client: reqwest::Client,
    backend_url: String,
}

impl HttpMemoryStore {
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

    fn url(&self) -> String {
        format!("{}/reflector_memory", self.backend_url)
    }
}

#[async_trait]
impl MemoryStore for HttpMemoryStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn load(&self) -> Option<ReflectorMemory> {
        let response = match self.client.get(self.url()).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "Reflector memory load failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "Reflector memory load failed");
            return None;
        }

        match response.json::<ReflectorMemory>().await {
            Ok(memory) => {
                debug!(
                    session_id = %memory.session_id,
                    cycles = memory.loop_cycles.len(),
                    heuristics = memory.learned_heuristics.len(),
                    "Loaded reflector memory"
                );
                Some(memory)
            }
            Err(err) => {
                warn!(error = %err, "Reflector memory document was unreadable");
                None
            }
        }
    }

    async fn save(&self, memory: &ReflectorMemory) -> bool {
        let response = match self.client.put(self.url()).json(memory).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "Reflector memory save failed");
                return false;
            }
        };

        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "Reflector memory save failed");
            return false;
        }

        debug!(session_id = %memory.session_id, "Saved reflector memory");
        true
    }
}
