//! Process graphs — declarative node/edge descriptions of agent roles and
//! prompt flow.
//!
//! A graph is immutable static configuration: it is validated once, then only
//! read while a loop runs. Two built-in graphs cover the standard A↔B loop
//! and the self-evolving reflector pattern; custom graphs can be loaded from
//! JSON since every type here round-trips through serde.

use crate::agent::ProviderKind;
use crate::error::GraphError;
use serde::{Deserialize, Serialize};

pub type NodeId = String;

/// The kind of a graph node. Only agent nodes exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Agent,
}

/// A hint about the shape of response a node should produce. Folded into the
/// step prompt as extra guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Reflection,
    Critique,
    Analysis,
    Summary,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Reflection => "reflection",
            MessageType::Critique => "critique",
            MessageType::Analysis => "analysis",
            MessageType::Summary => "summary",
        }
    }

    /// Type-specific guidance appended to the step prompt.
    pub fn guidance(&self) -> &'static str {
        match self {
            MessageType::Reflection => {
                "Focus on analyzing what has been done, what worked well, and what could be improved."
            }
            MessageType::Critique => {
                "Critically evaluate the input, identifying weaknesses and suggesting improvements."
            }
            MessageType::Analysis => {
                "Provide a detailed breakdown of the components and their relationships."
            }
            MessageType::Summary => {
                "Condense the key points and findings into a concise overview."
            }
        }
    }
}

/// Role payload of an agent node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
    pub backend: ProviderKind,
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<MessageType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub data: NodeData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A declarative agent-flow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub entry: NodeId,
}

/// Node ids used by the built-in reflector graph. The reflector loop resolves
/// its fixed A→R→B→R pattern through these.
pub const AGENT_A_NODE: &str = "agent_a";
pub const AGENT_B_NODE: &str = "agent_b";
pub const REFLECTOR_NODE: &str = "reflector";

const REFLECTOR_INSTRUCTIONS: &str = "You are Agent R, a Self-Evolving Reflector. Your role is to enhance, critique, or evolve the output from the other agent, using your memory log (provided as JSON) to inform your strategy.\n\n1. Analyze the provided memory log for effective past strategies and learned heuristics.\n2. Decide on a reflection/enhancement strategy for this turn, and state it explicitly.\n3. Output an enhanced or critiqued version of the incoming text.\n4. Output a structured JSON update with this cycle's events, your chosen strategy, and any new or updated heuristics.\n\nAlways output both the enhanced text and the memory update JSON as specified.";

impl ProcessGraph {
    /// The standard two-agent loop: ideation and critique cycling forever.
    pub fn standard() -> Self {
        Self {
            nodes: vec![
                Node {
                    id: "ideation".into(),
                    kind: NodeKind::Agent,
                    data: NodeData {
                        label: "Ideation".into(),
                        backend: ProviderKind::Ollama,
                        instructions: "Generate creative ideas for the user's prompt.".into(),
                        message_type: None,
                    },
                },
                Node {
                    id: "critic".into(),
                    kind: NodeKind::Agent,
                    data: NodeData {
                        label: "Critic".into(),
                        backend: ProviderKind::Ollama,
                        instructions: "Critique the previous idea and suggest improvements.".into(),
                        message_type: Some(MessageType::Critique),
                    },
                },
            ],
            edges: vec![
                Edge {
                    source: "ideation".into(),
                    target: "critic".into(),
                    label: None,
                },
                Edge {
                    source: "critic".into(),
                    target: "ideation".into(),
                    label: None,
                },
            ],
            entry: "ideation".into(),
        }
    }

    /// The self-evolving reflector pattern: initiator → reflector →
    /// critic → reflector.
    pub fn reflector() -> Self {
        Self {
            nodes: vec![
                Node {
                    id: AGENT_A_NODE.into(),
                    kind: NodeKind::Agent,
                    data: NodeData {
                        label: "Agent A (Ideation)".into(),
                        backend: ProviderKind::Ollama,
                        instructions: "Generate creative ideas for the user's prompt.".into(),
                        message_type: None,
                    },
                },
                Node {
                    id: REFLECTOR_NODE.into(),
                    kind: NodeKind::Agent,
                    data: NodeData {
                        label: "Reflector (Agent R)".into(),
                        backend: ProviderKind::Ollama,
                        instructions: REFLECTOR_INSTRUCTIONS.into(),
                        message_type: Some(MessageType::Reflection),
                    },
                },
                Node {
                    id: AGENT_B_NODE.into(),
                    kind: NodeKind::Agent,
                    data: NodeData {
                        label: "Agent B (Critic)".into(),
                        backend: ProviderKind::Ollama,
                        instructions:
                            "Critique the enhanced idea and suggest improvements or new directions."
                                .into(),
                        message_type: Some(MessageType::Critique),
                    },
                },
            ],
            edges: vec![
                Edge {
                    source: AGENT_A_NODE.into(),
                    target: REFLECTOR_NODE.into(),
                    label: None,
                },
                Edge {
                    source: REFLECTOR_NODE.into(),
                    target: AGENT_B_NODE.into(),
                    label: None,
                },
                Edge {
                    source: AGENT_B_NODE.into(),
                    target: REFLECTOR_NODE.into(),
                    label: None,
                },
                Edge {
                    source: REFLECTOR_NODE.into(),
                    target: AGENT_A_NODE.into(),
                    label: None,
                },
            ],
            entry: AGENT_A_NODE.into(),
        }
    }

    /// Validate the structural invariants: the entry node exists and every
    /// edge endpoint names an existing node.
    pub fn validate(&self) -> std::result::Result<(), GraphError> {
        if self.node(&self.entry).is_none() {
            return Err(GraphError::MissingEntry(self.entry.clone()));
        }
        for edge in &self.edges {
            if self.node(&edge.source).is_none() || self.node(&edge.target).is_none() {
                return Err(GraphError::DanglingEdge {
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The target of the first outgoing edge from `id`, if any.
    ///
    /// Only single-outgoing-edge routing is supported; additional edges from
    /// the same source are representable but never taken.
    pub fn next_node(&self, id: &str) -> Option<&NodeId> {
        self.edges.iter().find(|e| e.source == id).map(|e| &e.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_graphs_validate() {
        ProcessGraph::standard().validate().unwrap();
        ProcessGraph::reflector().validate().unwrap();
    }

    #[test]
    fn standard_graph_cycles() {
        let graph = ProcessGraph::standard();
        assert_eq!(graph.entry, "ideation");
        assert_eq!(graph.next_node("ideation").unwrap(), "critic");
        assert_eq!(graph.next_node("critic").unwrap(), "ideation");
    }

    #[test]
    fn reflector_graph_routes_through_reflector() {
        let graph = ProcessGraph::reflector();
        assert_eq!(graph.next_node(AGENT_A_NODE).unwrap(), REFLECTOR_NODE);
        assert_eq!(graph.next_node(AGENT_B_NODE).unwrap(), REFLECTOR_NODE);
        // First matching edge wins for the reflector's two outgoing edges.
        assert_eq!(graph.next_node(REFLECTOR_NODE).unwrap(), AGENT_B_NODE);
    }

    #[test]
    fn missing_entry_rejected() {
        let mut graph = ProcessGraph::standard();
        graph.entry = "ghost".into();
        assert_eq!(
            graph.validate().unwrap_err(),
            GraphError::MissingEntry("ghost".into())
        );
    }

    #[test]
    fn dangling_edge_rejected() {
        let mut graph = ProcessGraph::standard();
        graph.edges.push(Edge {
            source: "critic".into(),
            target: "ghost".into(),
            label: None,
        });
        assert!(matches!(
            graph.validate().unwrap_err(),
            GraphError::DanglingEdge { .. }
        ));
    }

    #[test]
    fn dead_end_has_no_next_node() {
        let graph = ProcessGraph {
            nodes: vec![Node {
                id: "only".into(),
                kind: NodeKind::Agent,
                data: NodeData {
                    label: "Only".into(),
                    backend: ProviderKind::Ollama,
                    instructions: "Respond once.".into(),
                    message_type: None,
                },
            }],
            edges: vec![],
            entry: "only".into(),
        };
        graph.validate().unwrap();
        assert!(graph.next_node("only").is_none());
    }

    #[test]
    fn graph_round_trips_through_json() {
        let graph = ProcessGraph::reflector();
        let json = serde_json::to_string(&graph).unwrap();
        assert!(json.contains("\"type\":\"agent\""));

        let back: ProcessGraph = serde_json::from_str(&json).unwrap();
        back.validate().unwrap();
        assert_eq!(back.nodes.len(), 3);
        assert_eq!(back.entry, AGENT_A_NODE);
    }
}
