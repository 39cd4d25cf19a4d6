//! Reflector memory persistence for metaloop.
//!
//! The memory document lives behind a backend endpoint as one JSON blob.
//! Stores are deliberately forgiving: a failed load yields `None` (the
//! caller reinitializes), a failed save yields `false` and is only logged —
//! the in-memory state stays authoritative for the session either way.

pub mod http;
pub mod in_memory;
pub mod session;

pub use http::HttpMemoryStore;
pub use in_memory::InMemoryStore;
pub use session::ReflectorSession;

use async_trait::async_trait;
use metaloop_core::ReflectorMemory;

/// Whole-document load/save of the reflector memory.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    fn name(&self) -> &str;

    /// Load the persisted document. `None` means "absent or unreadable";
    /// callers treat that as "needs reinitialization".
    async fn load(&self) -> Option<ReflectorMemory>;

    /// Persist the document. Returns whether the write was acknowledged.
    async fn save(&self, memory: &ReflectorMemory) -> bool;
}
