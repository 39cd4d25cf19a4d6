//! Newline-delimited JSON plumbing for the Ollama chat stream.
//!
//! The response body arrives as arbitrary byte chunks; `LineBuffer` splits
//! them back into complete lines (a chunk can end mid-line, so the tail is
//! held until its newline arrives) and `parse_line` decodes one chunk
//! document. Malformed lines are skipped with a warning, never fatal.

use serde::Deserialize;
use tracing::warn;

/// One NDJSON chunk from `/api/chat`: `{"message":{"content":...},"done":...}`.
#[derive(Debug, Default, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub content: String,
}

impl ChatChunk {
    /// The incremental token text carried by this chunk.
    pub fn delta(&self) -> &str {
        self.message.as_ref().map(|m| m.content.as_str()).unwrap_or("")
    }
}

/// Reassembles complete lines out of a byte-chunked stream.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes and return every line completed by them.
    /// Trailing `\r` is trimmed; the unterminated tail stays buffered.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.push_str(&String::from_utf8_lossy(bytes));

        let mut lines = Vec::new();
        while let Some(newline) = self.buf.find('\n') {
            let line = self.buf[..newline].trim_end_matches('\r').to_string();
            self.buf.drain(..=newline);
            lines.push(line);
        }
        lines
    }

    /// Take whatever is left once the body ends without a final newline.
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.buf.trim().is_empty() {
            self.buf.clear();
            return None;
        }
        Some(std::mem::take(&mut self.buf))
    }
}

/// Parse one stream line. Empty lines and unparseable lines yield `None`;
/// the latter are logged and skipped.
pub fn parse_line(line: &str) -> Option<ChatChunk> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(chunk) => Some(chunk),
        Err(err) => {
            warn!(error = %err, line, "Skipping malformed stream line");
            None
        }
    }
}
