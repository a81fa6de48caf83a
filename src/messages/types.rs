use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One utterance request received from the control channel.
///
/// Immutable once created; the speech worker consumes and discards it after
/// a single pass through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextItem {
    pub id: Uuid,
    text: String,
    pub received_at: DateTime<Utc>,
}

impl TextItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            received_at: Utc::now(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Milliseconds spent between arrival and `now`.
    pub fn waited_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.received_at).num_milliseconds().max(0)
    }

    /// Shortened text for log lines.
    pub fn preview(&self) -> &str {
        match self.text.char_indices().nth(50) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }
}
