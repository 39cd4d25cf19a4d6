//! The working reflector memory for one loop run.
//!
//! Wraps the in-memory document together with its store. Mutations apply to
//! the document first, then persist in the background: best-effort
//! asynchronous writes, last write wins, and the loop never waits on them.
//! Only `reset` persists synchronously, since it replaces the whole session.

use crate::MemoryStore;
use metaloop_core::{Heuristic, MemoryDelta, ReflectorMemory};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub struct ReflectorSession {
    memory: ReflectorMemory,
    store: Arc<dyn MemoryStore>,
}

impl ReflectorSession {
    /// Load the persisted document, or start a fresh session when nothing
    /// usable is stored.
    pub async fn load_or_fresh(
        store: Arc<dyn MemoryStore>,
        seed_prompt: &str,
        overall_goal: &str,
    ) -> Self {
        let memory = match store.load().await {
            Some(mut memory) => {
                info!(
                    session_id = %memory.session_id,
                    cycles = memory.loop_cycles.len(),
                    "Resuming reflector memory"
                );
                memory.seed_prompt = seed_prompt.to_string();
                memory
            }
            None => {
                info!("No usable reflector memory, starting fresh");
                ReflectorMemory::fresh(seed_prompt, overall_goal)
            }
        };

        let session = Self { memory, store };
        session.persist_background();
        session
    }

    pub fn memory(&self) -> &ReflectorMemory {
        &self.memory
    }

    /// Append a cycle summary and persist in the background.
    pub fn append_cycle(&mut self, cycle: Value) {
        self.memory.append_cycle(cycle);
        self.persist_background();
    }

    /// Upsert a heuristic and persist in the background.
    pub fn upsert_heuristic(&mut self, heuristic: Heuristic) {
        self.memory.upsert_heuristic(heuristic);
        self.persist_background();
    }

    /// Apply a delta extracted from reflector output. One background persist
    /// covers the whole batch.
    pub fn apply(&mut self, delta: MemoryDelta) {
        if delta.is_empty() {
            return;
        }
        if let Some(cycle) = delta.cycle {
            self.memory.append_cycle(cycle);
        }
        for heuristic in delta.heuristics {
            self.memory.upsert_heuristic(heuristic);
        }
        self.persist_background();
    }

    /// Overwrite with a fresh template. The template is persisted before the
    /// in-memory state is swapped; a failed save is logged but does not keep
    /// the old session alive.
    pub async fn reset(&mut self, seed_prompt: &str, overall_goal: &str) -> bool {
        let fresh = ReflectorMemory::fresh(seed_prompt, overall_goal);
        let saved = self.store.save(&fresh).await;
        if !saved {
            warn!("Reflector memory reset was not persisted");
        }
        self.memory = fresh;
        saved
    }

    fn persist_background(&self) {
        let store = self.store.clone();
        let snapshot = self.memory.clone();
        tokio::spawn(async move {
            if !store.save(&snapshot).await {
                warn!("Background reflector memory save failed; in-memory state stays authoritative");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;
    use serde_json::json;
    use std::time::Duration;

    async fn settle() {
        // Background persists are spawned tasks; give them a beat.
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn fresh_session_when_store_is_empty() {
        let store = Arc::new(InMemoryStore::new());
        let session = ReflectorSession::load_or_fresh(store.clone(), "seed", "goal").await;

        assert_eq!(session.memory().seed_prompt, "seed");
        assert!(session.memory().loop_cycles.is_empty());

        settle().await;
        assert!(store.load().await.is_some());
    }

    #[tokio::test]
    async fn resumes_existing_document_with_new_seed() {
        let mut existing = ReflectorMemory::fresh("old seed", "goal");
        existing.append_cycle(json!({"summary": "from last run"}));
        let session_id = existing.session_id.clone();

        let store = Arc::new(InMemoryStore::seeded(existing));
        let session = ReflectorSession::load_or_fresh(store, "new seed", "goal").await;

        assert_eq!(session.memory().session_id, session_id);
        assert_eq!(session.memory().seed_prompt, "new seed");
        assert_eq!(session.memory().loop_cycles.len(), 1);
    }

    #[tokio::test]
    async fn apply_persists_cycle_and_heuristics() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = ReflectorSession::load_or_fresh(store.clone(), "s", "g").await;
        settle().await;

        session.apply(MemoryDelta {
            cycle: Some(json!({"summary": "cycle"})),
            heuristics: vec![Heuristic {
                heuristic_id: "h1".into(),
                rule: "rule".into(),
                evaluation: None,
                application_contexts: vec![],
                source_cycle: 0,
            }],
        });

        assert_eq!(session.memory().loop_cycles.len(), 1);
        assert_eq!(session.memory().learned_heuristics.len(), 1);

        settle().await;
        let persisted = store.load().await.unwrap();
        assert_eq!(persisted.loop_cycles.len(), 1);
        assert_eq!(persisted.learned_heuristics.len(), 1);
    }

    #[tokio::test]
    async fn apply_empty_delta_is_a_no_op() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = ReflectorSession::load_or_fresh(store, "s", "g").await;

        session.apply(MemoryDelta::default());
        assert!(session.memory().loop_cycles.is_empty());
    }

    #[tokio::test]
    async fn reset_replaces_session_and_persists_first() {
        let mut existing = ReflectorMemory::fresh("seed", "goal");
        existing.append_cycle(json!({"summary": "stale"}));
        let old_id = existing.session_id.clone();

        let store = Arc::new(InMemoryStore::seeded(existing));
        let mut session = ReflectorSession::load_or_fresh(store.clone(), "seed", "goal").await;
        settle().await;

        assert!(session.reset("seed", "goal").await);
        assert_ne!(session.memory().session_id, old_id);
        assert!(session.memory().loop_cycles.is_empty());

        let persisted = store.load().await.unwrap();
        assert_eq!(persisted.session_id, session.memory().session_id);
    }
}
