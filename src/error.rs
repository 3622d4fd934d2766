//! Error types for mail normalization

use std::fmt;

use thiserror::Error;

use crate::raw::RawMessageId;

/// Errors that abort the normalization of a message
#[derive(Error, Debug)]
pub enum ParseError {
    /// An address field could not be parsed into a valid email address
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// A text part declares conflicting charsets
    #[error("Too many charsets {charsets:?} for {content_type} part")]
    TooManyCharsets {
        content_type: String,
        charsets: Vec<String>,
    },

    /// The assembled message is missing required fields
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The raw bytes are not a mail structure at all
    #[error("Malformed envelope for raw message {raw_id}: {reason}")]
    MalformedEnvelope { raw_id: RawMessageId, reason: String },

    /// Parser configuration could not be loaded
    #[error("Invalid parser configuration: {0}")]
    Config(String),
}

/// Result type for normalization operations
pub type Result<T> = std::result::Result<T, ParseError>;

/// Every missing or invalid field found while assembling a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub problems: Vec<FieldProblem>,
}

impl ValidationError {
    /// Names of the offending fields, in the order they were checked
    #[must_use]
    pub fn fields(&self) -> Vec<&'static str> {
        self.problems.iter().map(|p| p.field).collect()
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.problems.iter().any(|p| p.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message validation failed: ")?;
        for (i, problem) in self.problems.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{problem}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// A single field that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProblem {
    pub field: &'static str,
    pub kind: ProblemKind,
}

impl FieldProblem {
    #[must_use]
    pub const fn missing(field: &'static str) -> Self {
        Self {
            field,
            kind: ProblemKind::Missing,
        }
    }

    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            kind: ProblemKind::Invalid(reason.into()),
        }
    }
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ProblemKind::Missing => write!(f, "{} is missing", self.field),
            ProblemKind::Invalid(reason) => write!(f, "{} is invalid ({reason})", self.field),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProblemKind {
    Missing,
    Invalid(String),
}
