//! Reflector memory — the small persisted document that carries learning
//! across self-evolving reflector runs.
//!
//! The document accumulates cycle summaries and heuristics. Cycles are
//! opaque JSON objects appended once per reflective turn; heuristics are
//! upserted by `heuristic_id`. Field names match the backend's camelCase
//! document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

/// A learned heuristic. `heuristic_id` is the upsert key; models emit it as
/// either `heuristic_id` or `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heuristic {
    #[serde(alias = "id")]
    pub heuristic_id: String,
    #[serde(default)]
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub application_contexts: Vec<String>,
    #[serde(default)]
    pub source_cycle: u32,
}

/// The whole-document reflector memory, loaded and saved as one JSON blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectorMemory {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub seed_prompt: String,
    #[serde(default)]
    pub overall_goal: String,
    #[serde(default)]
    pub loop_cycles: Vec<Value>,
    #[serde(default)]
    pub learned_heuristics: Vec<Heuristic>,
}

impl ReflectorMemory {
    /// A fresh template for a new session.
    pub fn fresh(seed_prompt: impl Into<String>, overall_goal: impl Into<String>) -> Self {
        Self {
            session_id: format!("session_{}", Uuid::new_v4()),
            start_time: Utc::now(),
            seed_prompt: seed_prompt.into(),
            overall_goal: overall_goal.into(),
            loop_cycles: Vec::new(),
            learned_heuristics: Vec::new(),
        }
    }

    /// Append an opaque cycle summary.
    pub fn append_cycle(&mut self, cycle: Value) {
        self.loop_cycles.push(cycle);
    }

    /// Insert or replace a heuristic by `heuristic_id`.
    ///
    /// Keeps `learned_heuristics` unique per id; the latest payload wins.
    pub fn upsert_heuristic(&mut self, heuristic: Heuristic) {
        match self
            .learned_heuristics
            .iter_mut()
            .find(|h| h.heuristic_id == heuristic.heuristic_id)
        {
            Some(existing) => *existing = heuristic,
            None => self.learned_heuristics.push(heuristic),
        }
    }

    /// The JSON context injected into the reflector's system prompt:
    /// the last cycle summary, cycle count, recently identified patterns,
    /// all learned heuristics, and the overall goal.
    pub fn prompt_context(&self) -> Value {
        let last_cycle_summary = self
            .loop_cycles
            .last()
            .and_then(|c| c.get("summary"))
            .and_then(Value::as_str)
            .unwrap_or("N/A");

        let overall_goal = if self.overall_goal.is_empty() {
            "N/A"
        } else {
            self.overall_goal.as_str()
        };

        let recent_patterns: Vec<Value> = self.loop_cycles
            [self.loop_cycles.len().saturating_sub(2)..]
            .iter()
            .filter_map(|c| c.get("identified_patterns"))
            .filter_map(Value::as_array)
            .flatten()
            .cloned()
            .collect();

        json!({
            "lastCycleSummary": last_cycle_summary,
            "cycleCount": self.loop_cycles.len(),
            "recentPatterns": recent_patterns,
            "learnedHeuristics": self.learned_heuristics,
            "overallGoal": overall_goal,
        })
    }
}

/// A memory mutation extracted from a reflector turn's structured output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryDelta {
    pub cycle: Option<Value>,
    pub heuristics: Vec<Heuristic>,
}

impl MemoryDelta {
    /// Extract a delta from a structured output value.
    ///
    /// Accepted shapes, per the reflector output contract:
    /// - `{"memory_update": {"loopCycle": {...}, "heuristics": [...]}}`
    /// - `{"heuristics": [...]}` (bare, only honored when no `memory_update`
    ///   object is present)
    pub fn from_structured(value: &Value) -> Self {
        if let Some(update) = value.get("memory_update") {
            return Self {
                cycle: update.get("loopCycle").cloned(),
                heuristics: parse_heuristics(update.get("heuristics")),
            };
        }
        Self {
            cycle: None,
            heuristics: parse_heuristics(value.get("heuristics")),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cycle.is_none() && self.heuristics.is_empty()
    }
}

fn parse_heuristics(value: Option<&Value>) -> Vec<Heuristic> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(heuristic) => Some(heuristic),
            Err(err) => {
                warn!(error = %err, "Skipping heuristic without a usable id");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_template_is_empty() {
        let memory = ReflectorMemory::fresh("seed", "goal");
        assert!(memory.session_id.starts_with("session_"));
        assert!(memory.loop_cycles.is_empty());
        assert!(memory.learned_heuristics.is_empty());
    }

    #[test]
    fn upsert_is_idempotent_per_id() {
        let mut memory = ReflectorMemory::fresh("", "");
        memory.upsert_heuristic(Heuristic {
            heuristic_id: "h1".into(),
            rule: "first".into(),
            evaluation: None,
            application_contexts: vec![],
            source_cycle: 0,
        });
        memory.upsert_heuristic(Heuristic {
            heuristic_id: "h1".into(),
            rule: "second".into(),
            evaluation: Some("better".into()),
            application_contexts: vec![],
            source_cycle: 1,
        });

        assert_eq!(memory.learned_heuristics.len(), 1);
        assert_eq!(memory.learned_heuristics[0].rule, "second");
        assert_eq!(memory.learned_heuristics[0].source_cycle, 1);
    }

    #[test]
    fn upsert_appends_new_ids() {
        let mut memory = ReflectorMemory::fresh("", "");
        for id in ["a", "b", "a"] {
            memory.upsert_heuristic(Heuristic {
                heuristic_id: id.into(),
                rule: id.into(),
                evaluation: None,
                application_contexts: vec![],
                source_cycle: 0,
            });
        }
        assert_eq!(memory.learned_heuristics.len(), 2);
    }

    #[test]
    fn prompt_context_summarizes_last_cycle() {
        let mut memory = ReflectorMemory::fresh("seed", "explore the topic");
        memory.append_cycle(json!({"summary": "first pass", "identified_patterns": ["loops"]}));
        memory.append_cycle(json!({"summary": "second pass"}));

        let context = memory.prompt_context();
        assert_eq!(context["lastCycleSummary"], "second pass");
        assert_eq!(context["cycleCount"], 2);
        assert_eq!(context["overallGoal"], "explore the topic");
        assert_eq!(context["recentPatterns"][0], "loops");
    }

    #[test]
    fn prompt_context_defaults_when_empty() {
        let memory = ReflectorMemory::fresh("", "");
        let context = memory.prompt_context();
        assert_eq!(context["lastCycleSummary"], "N/A");
        assert_eq!(context["overallGoal"], "N/A");
        assert_eq!(context["cycleCount"], 0);
    }

    #[test]
    fn delta_prefers_explicit_memory_update() {
        let structured = json!({
            "memory_update": {
                "loopCycle": {"summary": "cycle one"},
                "heuristics": [{"heuristic_id": "h1", "rule": "stay concrete"}]
            },
            "heuristics": [{"heuristic_id": "ignored", "rule": "bare shape"}]
        });
        let delta = MemoryDelta::from_structured(&structured);
        assert_eq!(delta.cycle.as_ref().unwrap()["summary"], "cycle one");
        assert_eq!(delta.heuristics.len(), 1);
        assert_eq!(delta.heuristics[0].heuristic_id, "h1");
    }

    #[test]
    fn delta_accepts_bare_heuristics() {
        let structured = json!({
            "heuristics": [{"id": "h2", "rule": "alias id accepted"}]
        });
        let delta = MemoryDelta::from_structured(&structured);
        assert!(delta.cycle.is_none());
        assert_eq!(delta.heuristics[0].heuristic_id, "h2");
    }

    #[test]
    fn delta_skips_heuristics_without_id() {
        let structured = json!({
            "heuristics": [{"rule": "no id"}, {"heuristic_id": "h3", "rule": "ok"}]
        });
        let delta = MemoryDelta::from_structured(&structured);
        assert_eq!(delta.heuristics.len(), 1);
        assert_eq!(delta.heuristics[0].heuristic_id, "h3");
    }

    #[test]
    fn delta_empty_for_unrelated_output() {
        let delta = MemoryDelta::from_structured(&json!({"analysis": "nothing here"}));
        assert!(delta.is_empty());
    }

    #[test]
    fn memory_document_round_trips_camel_case() {
        let mut memory = ReflectorMemory::fresh("seed", "goal");
        memory.append_cycle(json!({"summary": "s"}));
        let json = serde_json::to_string(&memory).unwrap();
        assert!(json.contains("\"sessionId\""));
        assert!(json.contains("\"loopCycles\""));
        assert!(json.contains("\"learnedHeuristics\""));

        let back: ReflectorMemory = serde_json::from_str(&json).unwrap();
        assert_eq!(back.loop_cycles.len(), 1);
    }
}
