//! Search index document and storage contract.
//!
//! The engine does not talk to storage or search itself. These are the shapes
//! it hands to the collaborators that do.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::thread::ThreadId;
use crate::types::{MessagePart, MessageType, NormalizedMessage, RecipientAddress, RecipientRole};

/// Flag set on every freshly ingested message
pub const RECENT_FLAG: &str = "Recent";

/// Part metadata as indexed; content is never part of it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedPart {
    pub content_type: String,
    pub filename: Option<String>,
    pub size: usize,
    pub can_index: bool,
}

impl From<&MessagePart> for IndexedPart {
    fn from(part: &MessagePart) -> Self {
        Self {
            content_type: part.content_type.clone(),
            filename: part.filename.clone(),
            size: part.size,
            can_index: part.can_index,
        }
    }
}

/// A contact referenced by the message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedContact {
    pub address: String,
    #[serde(rename = "type")]
    pub role: RecipientRole,
}

impl From<&RecipientAddress> for IndexedContact {
    fn from(recipient: &RecipientAddress) -> Self {
        Self {
            address: recipient.canonical_address.clone(),
            role: recipient.role,
        }
    }
}

/// Denormalized view of a message for full-text and faceted search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDocument {
    pub message_id: String,
    pub thread_id: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub subject: Option<String>,
    #[serde(rename = "from_")]
    pub from: String,
    pub date: DateTime<Utc>,
    pub text: String,
    pub size: usize,
    pub tags: Vec<String>,
    pub flags: Vec<String>,
    pub parts: Vec<IndexedPart>,
    pub contacts: Vec<IndexedContact>,
    pub privacy_index: i64,
}

impl IndexDocument {
    /// Document for a message just stored under `message_id` in `thread_id`
    #[must_use]
    pub fn from_message(
        message_id: &str,
        thread_id: &ThreadId,
        message: &NormalizedMessage,
        tags: &[String],
    ) -> Self {
        Self {
            message_id: message_id.to_string(),
            thread_id: thread_id.0.clone(),
            message_type: message.message_type,
            subject: message.subject.clone(),
            from: message.from.clone(),
            date: message.date,
            text: message.text.clone(),
            size: message.size,
            tags: tags.to_vec(),
            flags: vec![RECENT_FLAG.to_string()],
            parts: message.parts.iter().map(IndexedPart::from).collect(),
            contacts: message.recipients.iter().map(IndexedContact::from).collect(),
            privacy_index: message.privacy_index,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// What the storage collaborator receives for one message
#[derive(Debug, Clone, Copy)]
pub struct StoredMessage<'a> {
    pub user_id: &'a str,
    pub message_id: &'a str,
    pub thread_id: &'a ThreadId,
    pub message: &'a NormalizedMessage,
}

/// Persistence backend for normalized messages
pub trait MessageStore {
    type Error: std::error::Error;

    fn store(&self, record: StoredMessage<'_>) -> Result<(), Self::Error>;
}
