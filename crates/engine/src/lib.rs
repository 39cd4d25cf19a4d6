//! The metaloop orchestration engine.
//!
//! Drives step-by-step execution across a process graph (standard mode) or
//! the fixed A→R→B→R reflector pattern, one streaming LLM call at a time.
//! UI-facing state changes are emitted as [`LoopEvent`]s over a channel; the
//! engine itself owns no rendering.

pub mod event;
pub mod output;
pub mod prompt;
pub mod runner;
pub mod transcript;

pub use event::{LoopEvent, LoopStatus};
pub use output::extract_trailing_json;
pub use runner::{AgentRoster, LoopOutcome, LoopRunner, LoopSettings};
pub use transcript::{HttpTranscriptStore, TranscriptStore};
