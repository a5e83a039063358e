//! Chat transcript shown in the panel.

use serde::{Deserialize, Serialize};

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single line of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
}

/// Append-only log of user/assistant exchanges.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Append a user command followed by the assistant's reply.
    pub fn push_exchange(&mut self, command: impl Into<String>, reply: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            role: Role::User,
            content: command.into(),
        });
        self.entries.push(TranscriptEntry {
            role: Role::Assistant,
            content: reply.into(),
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent entry, usually the assistant's last reply.
    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }
}
