//! Agent bindings — a role bound to a provider, model, and system prompt
//! for exactly one turn of the loop.

use serde::{Deserialize, Serialize};

/// The LLM backends an agent can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local Ollama server (streaming chat)
    Ollama,
    /// Groq, reached through the unified backend proxy
    Groq,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::Groq => "groq",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transient agent binding, constructed per step from the current graph
/// node plus the user-selected provider/model. Never persisted on its own.
#[derive(Debug, Clone)]
pub struct Agent {
    pub name: String,
    pub provider: ProviderKind,
    pub model: String,
    pub system_prompt: String,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        provider: ProviderKind,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            model: model.into(),
            system_prompt: system_prompt.into(),
        }
    }

    /// Whether the agent speaking at `step` is Agent A.
    ///
    /// Step parity alone decides the speaker identity; the graph decides the
    /// prompt flow.
    pub fn is_agent_a(step: u32) -> bool {
        step % 2 == 0
    }

    /// Display name for the primary agent at `step`.
    pub fn name_for_step(step: u32) -> &'static str {
        if Self::is_agent_a(step) { "Agent A" } else { "Agent B" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProviderKind::Ollama).unwrap(),
            "\"ollama\""
        );
        assert_eq!(
            serde_json::from_str::<ProviderKind>("\"groq\"").unwrap(),
            ProviderKind::Groq
        );
    }

    #[test]
    fn step_parity_selects_agent() {
        assert_eq!(Agent::name_for_step(0), "Agent A");
        assert_eq!(Agent::name_for_step(1), "Agent B");
        assert_eq!(Agent::name_for_step(2), "Agent A");
        assert_eq!(Agent::name_for_step(7), "Agent B");
    }
}
