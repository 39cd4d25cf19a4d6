//! Prompt composition for loop turns.
//!
//! Each step's user prompt is rebuilt from scratch: the formatted prior
//! conversation, the node's instructions, the original seed prompt, and the
//! running context (the previous agent's output, or the seed on step 0).

use metaloop_core::{Message, Node};
use serde_json::Value;

/// Display name of the reflector agent; display history pairing keys off it.
pub const REFLECTOR_AGENT_NAME: &str = "Self-Evolving Reflector";

/// Rendered in place of the prior-context block on the first step.
pub const NO_PRIOR_CONTEXT: &str = "No prior conversation.";

/// System prompt for primary agents on nodes without a specialized role.
pub const DEFAULT_AGENT_PROMPT: &str = "You are a helpful AI assistant engaged in a multi-turn conversation with another AI.\nYour goal is to have a productive, thoughtful, and insightful exchange.\nRespond to the provided context and continue the conversation constructively.";

/// The system prompt for a primary agent, keyed by the node's label.
///
/// Custom graphs can name their nodes after one of the specialized thinking
/// roles; anything else gets the default conversational prompt.
pub fn agent_system_prompt(node_label: &str) -> &'static str {
    match node_label {
        "creativeExpansion" => {
            "You are a creative, out-of-the-box thinker in a conversation with another AI.\nYour goal is to expand on ideas in unexpected and novel ways.\nLook for unique angles, metaphors, and connections that might not be immediately obvious.\nRespond to the provided context with creative, expansive thinking."
        }
        "criticalAnalysis" => {
            "You are an analytical, critical thinker in a conversation with another AI.\nYour goal is to carefully analyze, evaluate arguments, and identify potential issues.\nConsider different perspectives, weigh evidence, and point out logical inconsistencies or weaknesses.\nRespond to the provided context with careful, critical analysis."
        }
        "synthesis" => {
            "You are a synthesizing, integrating thinker in a conversation with another AI.\nYour goal is to bring together diverse ideas and perspectives into a coherent whole.\nLook for patterns, common threads, and ways to reconcile seemingly disparate concepts.\nRespond to the provided context by synthesizing and integrating the information."
        }
        "practical" => {
            "You are a practical, solution-oriented thinker in a conversation with another AI.\nYour goal is to focus on concrete applications, actionable steps, and real-world implementation.\nConsider feasibility, resources needed, and potential obstacles to implementation.\nRespond to the provided context with practical, applicable thinking."
        }
        "questionFormer" => {
            "You are a curious, question-generating thinker in a conversation with another AI.\nYour goal is to probe deeper, identify areas for further exploration, and stimulate thinking.\nGenerate thoughtful questions that open up new avenues for consideration.\nRespond to the provided context primarily by asking insightful questions."
        }
        "structure" => {
            "You are a structured, organizing thinker in a conversation with another AI.\nYour task is to help organize thoughts and ideas into clear frameworks.\nCreate structures, taxonomies, or categorizations that help make sense of complex information.\nRespond to the provided context by organizing ideas into clear structures."
        }
        _ => DEFAULT_AGENT_PROMPT,
    }
}

const REFLECTOR_TEMPLATE: &str = r#"You are the Self-Evolving Reflector, a specialized meta-cognitive AI that synthesizes insights and guides conversation evolution through reflection.

FULL MEMORY CONTEXT:
{memory_context}

YOUR SPECIFIC RESPONSIBILITIES:
1. Synthesize the key insights from the conversation so far
2. Reflect on the conversation trajectory and identify meta-patterns
3. Update the system memory with new observations and heuristics
4. Guide the next cycle by identifying promising directions
5. Detect and avoid repetitive patterns or conversational loops

FORMAT YOUR RESPONSE IN THREE PARTS:
1. REFLECTION: Your synthesis and meta-analysis
2. GUIDANCE: Specific directions for the next conversation cycle
3. STRUCTURED MEMORY UPDATE: Include a structured output section using the format below

[STRUCTURED_OUTPUT]
{
  "memory_update": {
    "loopCycle": {
      "summary": "Concise summary of this cycle's key developments",
      "identified_patterns": [
        {"pattern": "pattern name", "description": "pattern description", "significance": "why this matters"}
      ],
      "cycle_evolution": {
        "progress_score": 0.5,
        "novelty_score": 0.5,
        "stagnation_risk": "low/medium/high",
        "breakthrough_potential": "low/medium/high"
      }
    },
    "heuristics": [
      {
        "heuristic_id": "unique_id",
        "rule": "Concise rule statement",
        "evaluation": "Brief evaluation of the rule's utility",
        "application_contexts": ["context1", "context2"],
        "source_cycle": 0
      }
    ]
  }
}
[/STRUCTURED_OUTPUT]

IMPORTANT: Your primary goal is to prevent conversational stagnation by identifying the most promising directions for further exploration. Be specific in your guidance and vigilant about detecting repetitive patterns."#;

/// Render past turns as labeled blocks for injection into the next prompt.
pub fn format_prior_context(history: &[Message]) -> String {
    history
        .iter()
        .enumerate()
        .map(|(i, msg)| {
            let model = if msg.model.is_empty() {
                String::new()
            } else {
                format!(" ({})", msg.model)
            };
            let mut parts = vec![format!("### Turn {}: {}{}", i + 1, msg.agent, model)];
            parts.push(format!("**Full Response:**\n{}", msg.text));
            if let Some(structured) = &msg.structured {
                parts.push(format!(
                    "\n**Structured Data:**\n```json\n{}\n```",
                    serde_json::to_string_pretty(structured).unwrap_or_default()
                ));
            }
            parts.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Compose the user prompt for one node visit.
pub fn compose_step_prompt(
    node: &Node,
    prior_context: &str,
    seed_prompt: &str,
    input: &str,
) -> String {
    let mut content = format!(
        "Previous Context:\n{prior_context}\n\nYour Current Task ({label}):\n{instructions}\n\nSeed Prompt was: {seed_prompt}\n\nInput for this step:\n{input}",
        label = node.data.label,
        instructions = node.data.instructions,
    );

    if let Some(message_type) = node.data.message_type {
        content.push_str(&format!(
            "\n\nYour response should be in the form of a {} message. {}",
            message_type.as_str().to_uppercase(),
            message_type.guidance()
        ));
    }

    content.push_str(
        "\n\nWhen appropriate, include structured output in JSON format enclosed in [STRUCTURED_OUTPUT] and [/STRUCTURED_OUTPUT] tags.",
    );
    content
}

/// The reflector's system prompt: the template with the serialized memory
/// context injected.
pub fn reflector_system_prompt(memory_context: &Value) -> String {
    let rendered = serde_json::to_string_pretty(memory_context)
        .unwrap_or_else(|_| "No memory context available yet.".into());
    REFLECTOR_TEMPLATE.replace("{memory_context}", &rendered)
}
