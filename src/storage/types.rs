use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::inference::Role;

/// Metadata for a stored chat session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Row id of the session
    pub id: i64,
    /// Display name; derived from the first message once available
    pub name: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// System prompt applied to every request in the session
    pub system_prompt: String,
    /// Number of stored messages
    pub message_count: usize,
}

/// A persisted message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Row id; ascending ids give insertion order
    pub id: i64,
    /// Author of the message
    pub role: Role,
    /// Raw text, exactly as produced
    pub content: String,
    /// When the message was saved
    pub created_at: DateTime<Utc>,
}
