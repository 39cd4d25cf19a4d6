//! Loop-level events.
//!
//! `LoopEvent` carries everything a front end needs to mirror the run:
//! streaming buffer updates, completed turns, errors, and the final status.
//! Events are emitted over an mpsc channel; a dropped receiver never stops
//! the loop.

use metaloop_core::Message;
use serde::{Deserialize, Serialize};

/// Lifecycle of one loop execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopStatus {
    Idle,
    Running,
    /// Natural exit: step limit reached or the graph dead-ended.
    Completed,
    /// User-initiated stop.
    Stopped,
    /// A step failed; no retries, the run is over.
    Errored,
}

/// Events emitted by the engine during loop execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoopEvent {
    /// A new agent turn is starting.
    StepStarted {
        step: u32,
        agent: String,
        model: String,
    },

    /// The streaming buffer: always the full accumulated text so far.
    StreamSnapshot {
        agent: String,
        model: String,
        text: String,
    },

    /// A completed, immutable turn was appended to the history.
    Turn { message: Message },

    /// A step failed; mirrors the UI error slot.
    Error { message: String },

    /// The loop halted. Final event of every run.
    Finished { status: LoopStatus, steps: u32 },
}

impl LoopEvent {
    /// Stable event name, e.g. for SSE-style forwarding.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StepStarted { .. } => "step_started",
            Self::StreamSnapshot { .. } => "stream_snapshot",
            Self::Turn { .. } => "turn",
            Self::Error { .. } => "error",
            Self::Finished { .. } => "finished",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_snapshot() {
        let event = LoopEvent::StreamSnapshot {
            agent: "Agent A".into(),
            model: "llama3".into(),
            text: "partial".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"stream_snapshot""#));
        assert!(json.contains(r#""text":"partial""#));
    }

    #[test]
    fn event_serialization_finished() {
        let event = LoopEvent::Finished {
            status: LoopStatus::Stopped,
            steps: 3,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""status":"stopped""#));
        assert!(json.contains(r#""steps":3"#));
    }

    #[test]
    fn event_type_names() {
        assert_eq!(
            LoopEvent::Error { message: "x".into() }.event_type(),
            "error"
        );
        assert_eq!(
            LoopEvent::StepStarted {
                step: 0,
                agent: "a".into(),
                model: "m".into()
            }
            .event_type(),
            "step_started"
        );
    }

    #[test]
    fn event_deserialization() {
        let json = r#"{"type":"error","message":"boom"}"#;
        let event: LoopEvent = serde_json::from_str(json).unwrap();
        match event {
            LoopEvent::Error { message } => assert_eq!(message, "boom"),
            _ => panic!("Wrong variant"),
        }
    }
}
