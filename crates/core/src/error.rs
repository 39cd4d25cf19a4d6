//! Error types for the metaloop domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all metaloop operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Process graph errors ---
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    // --- Transcript persistence errors ---
    #[error("Transcript error: {0}")]
    Transcript(#[from] TranscriptError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Stream interrupted: {0}")]
    Stream(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Whether this error is a user-initiated cancellation.
    ///
    /// The loop treats cancellation as a graceful stop, every other provider
    /// failure as a terminal step error.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProviderError::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Entry node '{0}' not found in graph")]
    MissingEntry(String),

    #[error("Edge references unknown node: {source} -> {target}")]
    DanglingEdge { source: String, target: String },

    #[error("Node '{0}' not found in graph")]
    MissingNode(String),
}

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Save failed: {message} (status: {status_code})")]
    Http { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response shape: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::Api {
            status_code: 502,
            message: "upstream unavailable".into(),
        });
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("upstream unavailable"));
    }

    #[test]
    fn cancelled_is_distinguished() {
        assert!(ProviderError::Cancelled.is_cancelled());
        assert!(!ProviderError::Network("refused".into()).is_cancelled());
    }

    #[test]
    fn graph_error_displays_correctly() {
        let err = Error::Graph(GraphError::DanglingEdge {
            source: "ideation".into(),
            target: "ghost".into(),
        });
        assert!(err.to_string().contains("ideation"));
        assert!(err.to_string().contains("ghost"));
    }
}
