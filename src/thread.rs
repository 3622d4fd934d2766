//! Thread association: prioritized lookup keys and the resolver contract

use serde::{Deserialize, Serialize};
use std::fmt;

/// A candidate key for finding the thread a message belongs to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ThreadLookupKey {
    /// External id of the message this one replies to
    Parent(String),
    /// Mailing list identifier
    List(String),
    /// Sender address
    From(String),
}

impl ThreadLookupKey {
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Parent(v) | Self::List(v) | Self::From(v) => v,
        }
    }
}

impl fmt::Display for ThreadLookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parent(v) => write!(f, "parent:{v}"),
            Self::List(v) => write!(f, "list:{v}"),
            Self::From(v) => write!(f, "from:{v}"),
        }
    }
}

/// Build the lookup sequence: parent reference, then mailing lists, then sender
#[must_use]
pub fn lookup_sequence(
    external_parent_id: Option<&str>,
    lists: &[String],
    from: Option<&str>,
) -> Vec<ThreadLookupKey> {
    let mut seq = Vec::with_capacity(lists.len() + 2);

    if let Some(parent) = external_parent_id {
        seq.push(ThreadLookupKey::Parent(parent.to_string()));
    }
    seq.extend(lists.iter().cloned().map(ThreadLookupKey::List));
    if let Some(from) = from {
        seq.push(ThreadLookupKey::From(from.to_string()));
    }

    seq
}

/// Identifier of a conversation thread, opaque to the engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ThreadId(pub String);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread lookup backend, implemented by the storage side
pub trait ThreadResolver {
    /// Thread already associated with `key`, if any
    fn lookup(&self, key: &ThreadLookupKey) -> Option<ThreadId>;
}

/// Outcome of walking a lookup sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadAssignment {
    /// The first key that matched and the thread it points to
    Existing {
        thread_id: ThreadId,
        matched: ThreadLookupKey,
    },
    /// No key matched, a new thread is needed
    New,
}

/// Try each key in order and stop at the first match
pub fn resolve_thread<R: ThreadResolver + ?Sized>(
    sequence: &[ThreadLookupKey],
    resolver: &R,
) -> ThreadAssignment {
    sequence
        .iter()
        .find_map(|key| {
            resolver.lookup(key).map(|thread_id| ThreadAssignment::Existing {
                thread_id,
                matched: key.clone(),
            })
        })
        .unwrap_or(ThreadAssignment::New)
}
