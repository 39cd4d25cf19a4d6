//! In-memory store — useful for testing and offline sessions.

use crate::MemoryStore;
use async_trait::async_trait;
use metaloop_core::ReflectorMemory;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A store that keeps the document in process memory.
#[derive(Default)]
pub struct InMemoryStore {
    doc: Arc<RwLock<Option<ReflectorMemory>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start pre-populated, as if a previous session had persisted.
    pub fn seeded(memory: ReflectorMemory) -> Self {
        Self {
            doc: Arc::new(RwLock::new(Some(memory))),
        }
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self) -> Option<ReflectorMemory> {
        self.doc.read().await.clone()
    }

    async fn save(&self, memory: &ReflectorMemory) -> bool {
        *self.doc.write().await = Some(memory.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_store_loads_none() {
        let store = InMemoryStore::new();
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = InMemoryStore::new();
        let memory = ReflectorMemory::fresh("seed", "goal");
        assert!(store.save(&memory).await);

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.session_id, memory.session_id);
        assert_eq!(loaded.seed_prompt, "seed");
    }

    #[tokio::test]
    async fn seeded_store_loads_existing_document() {
        let memory = ReflectorMemory::fresh("old seed", "old goal");
        let session_id = memory.session_id.clone();
        let store = InMemoryStore::seeded(memory);

        assert_eq!(store.load().await.unwrap().session_id, session_id);
    }
}
