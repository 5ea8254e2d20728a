use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::Language;

/// One processed line yielded by the consumer loop.
///
/// `text` is always present when the event is emitted; `translation` and
/// `context` are `None` when their service call failed for this iteration.
#[derive(Debug, Clone, Serialize)]
pub struct LineResult {
    /// Index of the line within the conversation.
    pub line_index: usize,
    /// Transcript of the (still open) line.
    pub text: String,
    pub translation: Option<String>,
    pub context: Option<String>,
    /// Whether this drain started a new line rather than revising the
    /// previous one.
    pub new_line: bool,
    pub timestamp: DateTime<Utc>,
}

/// Events delivered on the result stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Line(LineResult),
    /// Terminal event: the loop observed cancellation and is returning the
    /// accumulated conversation.
    Stopped { conversation: Vec<String> },
}

/// Snapshot of a session for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub state: super::controller::RunState,
    pub started_at: Option<DateTime<Utc>>,
    pub lines: usize,
    pub queued_chunks: usize,
    pub spoken_language: Language,
    pub target_language: Language,
    pub scenario: String,
}
