// Enforce at crate level
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

//! Mail normalization engine
//!
//! Turns raw RFC 2822 mail into normalized, indexable message records.
//!
//! # Features
//!
//! - Canonical recipient addresses (lowercased, `+extension` stripped)
//! - Repeated headers grouped under one name, RFC 2047 decoded
//! - Flat, ordered leaf parts with transfer and charset decoding
//! - PGP and transport security signals, spam level and privacy index
//! - Prioritized thread lookup keys
//!
//! Decode problems in a single header or part never fail a message; they are
//! substituted and reported as degradations.
//!
//! # Example
//!
//! ```rust
//! use mail_normalize::{ThreadLookupKey, parse_email};
//!
//! let raw = b"From: \"Jane\" <jane+news@Example.com>\r\n\
//!             Date: Wed, 01 Jan 2025 12:00:00 +0000\r\n\
//!             Subject: Hello\r\n\
//!             \r\n\
//!             Body";
//! let parsed = parse_email(raw).unwrap();
//!
//! assert_eq!(parsed.message.from, "jane@example.com");
//! assert_eq!(parsed.message.privacy_index, 10);
//! assert_eq!(
//!     parsed.lookup,
//!     vec![ThreadLookupKey::From("jane@example.com".into())]
//! );
//! ```

mod address;
mod config;
mod decode;
mod envelope;
mod error;
mod headers;
mod index;
mod message;
mod parser;
mod parts;
mod privacy;
mod raw;
mod thread;
mod types;

pub use address::{
    clean_email_address, parse_address_header, parse_address_list, parse_recipient_header,
    parse_recipients,
};
pub use config::ParserConfig;
pub use decode::{DecodeIssue, Decoded, Degradation, decode_encoded_words, decode_text};
pub use envelope::{BodyNode, Envelope, LeafNode, RawHeader, TransferEncoding};
pub use error::{FieldProblem, ParseError, ProblemKind, Result, ValidationError};
pub use headers::{HeaderTable, group_headers, normalize_name};
pub use index::{IndexDocument, IndexedContact, IndexedPart, MessageStore, RECENT_FLAG, StoredMessage};
pub use message::{Field, MailMessage, assemble};
pub use parser::{parse_email, parse_message};
pub use parts::{ExtractedParts, extract_parts};
pub use privacy::{PrivacyConfig, Signals, SpamPolicy, analyze, content_security};
pub use raw::{RawMessage, RawMessageId};
pub use thread::{
    ThreadAssignment, ThreadId, ThreadLookupKey, ThreadResolver, lookup_sequence, resolve_thread,
};
pub use types::*;
