//! Raw message bytes as handed over by the ingest pipeline

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque identifier of a raw message, used for content addressing and diagnosis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RawMessageId(pub String);

impl RawMessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Storage key derived from an external Message-ID (hex encoded SHA-256)
    #[must_use]
    pub fn for_external_id(message_id: &str) -> Self {
        Self(format!("{:x}", Sha256::digest(message_id.as_bytes())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawMessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unparsed mail, never mutated once built
#[derive(Debug, Clone)]
pub struct RawMessage {
    id: RawMessageId,
    data: Vec<u8>,
}

impl RawMessage {
    pub fn new(id: RawMessageId, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> &RawMessageId {
        &self.id
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
