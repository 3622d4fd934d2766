//! Core types of a normalized message

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::clean_email_address;
use crate::decode::Degradation;
use crate::error::Result;
use crate::headers::HeaderTable;
use crate::thread::ThreadLookupKey;

/// Kind of message, used to pick the base privacy score
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Mail,
}

impl MessageType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mail => "mail",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header a recipient was found in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecipientRole {
    From,
    To,
    Cc,
    Bcc,
}

impl RecipientRole {
    pub const ALL: [Self; 4] = [Self::From, Self::To, Self::Cc, Self::Bcc];

    /// Header carrying recipients of this role
    #[must_use]
    pub const fn header_name(self) -> &'static str {
        match self {
            Self::From => "From",
            Self::To => "To",
            Self::Cc => "Cc",
            Self::Bcc => "Bcc",
        }
    }
}

/// A resolved recipient address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipientAddress {
    /// Lowercased, `+extension` stripped; used for identity matching
    pub canonical_address: String,

    /// Address as written in the header, kept for display
    pub raw_address: String,

    /// Display name, when the header carried one
    pub display_name: Option<String>,

    pub role: RecipientRole,
}

impl RecipientAddress {
    /// Parse a single header-style address such as `"Jane" <jane+work@example.com>`
    pub fn parse(raw: &str, role: RecipientRole) -> Result<Self> {
        let (canonical_address, raw_address) = clean_email_address(raw)?;
        Ok(Self {
            canonical_address,
            raw_address,
            display_name: display_name_of(raw),
            role,
        })
    }
}

fn display_name_of(raw: &str) -> Option<String> {
    let start = raw.find('<')?;
    let name = raw[..start].trim().trim_matches('"').trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

impl fmt::Display for RecipientAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(name) => write!(f, "{} <{}>", name, self.raw_address),
            None => write!(f, "{}", self.raw_address),
        }
    }
}

/// Content of a part: decoded text for indexable parts, bytes otherwise
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PartData {
    Text(String),
    Binary(Vec<u8>),
}

impl PartData {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }
}

/// A leaf MIME part
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessagePart {
    pub content_type: String,

    pub filename: Option<String>,

    /// Size of the payload as transmitted, before transfer decoding
    pub size: usize,

    /// Whether `data` goes into the message's full-text
    pub can_index: bool,

    /// Declared charset of a text part
    pub charset: Option<String>,

    pub data: PartData,
}

impl MessagePart {
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        if self.can_index {
            self.data.as_text()
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.filename.is_some()
    }
}

/// Content security mechanisms detected in a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContentSecurity {
    #[serde(rename = "PGP")]
    Pgp,
    #[serde(rename = "PGPSIGNED")]
    PgpSigned,
}

impl ContentSecurity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pgp => "PGP",
            Self::PgpSigned => "PGPSIGNED",
        }
    }
}

impl fmt::Display for ContentSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security posture of a message
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrivacyFeatures {
    /// Encryption in transit, `None` when the transport did not tell
    pub transport_security: Option<bool>,

    pub content_security: BTreeSet<ContentSecurity>,
}

impl PrivacyFeatures {
    #[must_use]
    pub fn has(&self, feature: ContentSecurity) -> bool {
        self.content_security.contains(&feature)
    }
}

/// Facts about a message that its bytes do not carry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestContext {
    pub message_type: MessageType,

    /// Whether the message arrived over an encrypted transport, if known
    pub transport_security: Option<bool>,
}

impl IngestContext {
    #[must_use]
    pub const fn with_transport_security(mut self, encrypted: bool) -> Self {
        self.transport_security = Some(encrypted);
        self
    }
}

/// A fully normalized message, ready for the storage and index collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedMessage {
    pub message_type: MessageType,

    pub subject: Option<String>,

    /// Canonical sender address
    pub from: String,

    /// Every resolved From/To/Cc/Bcc address
    pub recipients: Vec<RecipientAddress>,

    /// Leaf parts in document order
    pub parts: Vec<MessagePart>,

    pub headers: HeaderTable,

    pub date: DateTime<Utc>,

    /// Length of the raw message in bytes
    pub size: usize,

    /// Indexable text of all parts, newline separated
    pub text: String,

    /// Message-ID header value
    pub external_message_id: Option<String>,

    /// In-Reply-To header value
    pub external_parent_id: Option<String>,

    /// List-ID header values
    pub lists: Vec<String>,

    pub privacy_features: PrivacyFeatures,

    pub privacy_index: i64,

    /// 0.0 (clean) to 100.0 (spam)
    pub spam_level: f64,

    /// Lossy decodes that happened while parsing
    pub degradations: Vec<Degradation>,
}

impl NormalizedMessage {
    pub fn recipients_with(&self, role: RecipientRole) -> impl Iterator<Item = &RecipientAddress> {
        self.recipients.iter().filter(move |r| r.role == role)
    }

    #[must_use]
    pub fn attachment_count(&self) -> usize {
        self.parts.iter().filter(|p| p.is_attachment()).count()
    }
}

/// Output of the engine: the message and its thread lookup candidates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedMessage {
    pub message: NormalizedMessage,

    /// Thread lookup keys in resolution priority order
    pub lookup: Vec<ThreadLookupKey>,
}
