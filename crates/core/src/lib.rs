//! # metaloop Core
//!
//! Domain types and error definitions for the metaloop conversation-loop
//! runtime. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The process graph, message shapes, and reflector memory document are plain
//! data here. Behavior (streaming clients, stores, the loop state machine)
//! lives in the outer crates, which all depend inward on core.

pub mod agent;
pub mod cancel;
pub mod error;
pub mod graph;
pub mod memory;
pub mod message;

// Re-export key types at crate root for ergonomics
pub use agent::{Agent, ProviderKind};
pub use cancel::CancelToken;
pub use error::{Error, GraphError, ProviderError, Result, TranscriptError};
pub use graph::{Edge, MessageType, Node, NodeData, NodeId, NodeKind, ProcessGraph};
pub use memory::{Heuristic, MemoryDelta, ReflectorMemory};
pub use message::{ChatMessage, ChatRole, Message, Transcript};
