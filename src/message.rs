//! Mail message structure and assembly into a [`NormalizedMessage`]

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::address::{parse_address_header, parse_recipient_header};
use crate::config::ParserConfig;
use crate::decode::{Degradation, header_bytes_to_string};
use crate::envelope::{Envelope, RawHeader};
use crate::error::{FieldProblem, Result, ValidationError};
use crate::headers::{HeaderTable, group_headers};
use crate::parts::extract_parts;
use crate::privacy;
use crate::thread::{ThreadLookupKey, lookup_sequence};
use crate::types::{
    IngestContext, MessagePart, NormalizedMessage, ParsedMessage, RecipientAddress, RecipientRole,
};

/// A field the assembler requires, as found in the mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    Present(T),
    Missing,
    Invalid(String),
}

impl<T> Field<T> {
    pub const fn present(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Missing | Self::Invalid(_) => None,
        }
    }

    fn problem(&self, name: &'static str) -> Option<FieldProblem> {
        match self {
            Self::Present(_) => None,
            Self::Missing => Some(FieldProblem::missing(name)),
            Self::Invalid(reason) => Some(FieldProblem::invalid(name, reason.clone())),
        }
    }
}

/// Mail message structure.
///
/// Built from an envelope: recipients resolved, parts extracted, headers
/// grouped. Nothing here is validated yet, see [`assemble`].
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub from: Field<RecipientAddress>,
    pub recipients: Vec<RecipientAddress>,
    pub parts: Vec<MessagePart>,
    pub headers: HeaderTable,
    pub subject: Option<String>,
    pub date: Field<DateTime<Utc>>,
    pub external_message_id: Option<String>,
    pub external_parent_id: Option<String>,
    pub size: usize,
    pub degradations: Vec<Degradation>,
}

impl MailMessage {
    /// Resolve recipients, extract parts and group headers of an envelope.
    ///
    /// `size` is the length of the raw message the envelope came from.
    pub fn from_envelope(envelope: &Envelope, size: usize) -> Result<Self> {
        let (headers, mut degradations) = group_headers(&envelope.headers);
        let extracted = extract_parts(&envelope.body)?;
        degradations.extend(extracted.degradations);

        // Addresses come from the undecoded headers: an encoded display
        // name may hide a comma.
        let from = extract_from(&envelope.headers);
        let mut recipients: Vec<RecipientAddress> = Vec::new();
        for role in RecipientRole::ALL {
            let limit = if role == RecipientRole::From { 1 } else { usize::MAX };
            for header in named(&envelope.headers, role.header_name()).take(limit) {
                recipients.extend(parse_recipient_header(header, role));
            }
        }

        Ok(Self {
            from,
            recipients,
            parts: extracted.parts,
            subject: headers.first("Subject").map(String::from),
            date: extract_date(&headers),
            external_message_id: non_empty(headers.first("Message-Id")),
            external_parent_id: non_empty(headers.first("In-Reply-To")),
            headers,
            size,
            degradations,
        })
    }

    /// Indexable text of the message.
    ///
    /// Empty when every part is opaque (an encrypted body, say); `None` only
    /// when the body has no part at all.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        if self.parts.is_empty() {
            return None;
        }
        let texts: Vec<&str> = self.parts.iter().filter_map(MessagePart::text).collect();
        Some(texts.join("\n"))
    }

    /// Mailing lists the message was sent through
    #[must_use]
    pub fn lists(&self) -> Vec<String> {
        self.headers
            .all("List-Id")
            .iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    /// Canonical sender address, when one resolved
    #[must_use]
    pub fn from_address(&self) -> Option<&str> {
        self.from.present().map(|r| r.canonical_address.as_str())
    }

    #[must_use]
    pub fn lookup_sequence(&self) -> Vec<ThreadLookupKey> {
        lookup_sequence(
            self.external_parent_id.as_deref(),
            &self.lists(),
            self.from_address(),
        )
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn named<'a>(headers: &'a [RawHeader], name: &'a str) -> impl Iterator<Item = &'a RawHeader> {
    headers
        .iter()
        .filter(move |h| h.name.trim().eq_ignore_ascii_case(name))
}

fn extract_from(headers: &[RawHeader]) -> Field<RecipientAddress> {
    let Some(header) = named(headers, RecipientRole::From.header_name()).next() else {
        return Field::Missing;
    };
    let value = header_bytes_to_string(&header.value);
    if value.trim().is_empty() {
        return Field::Missing;
    }

    match parse_address_header(header, RecipientRole::From).into_iter().next() {
        Some(Ok(from)) => Field::Present(from),
        Some(Err(e)) => Field::Invalid(e.to_string()),
        None => Field::Invalid(format!("no address in {:?}", value.trim())),
    }
}

fn extract_date(headers: &HeaderTable) -> Field<DateTime<Utc>> {
    let Some(value) = headers.first("Date").map(str::trim).filter(|v| !v.is_empty()) else {
        return Field::Missing;
    };

    DateTime::parse_from_rfc2822(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            mailparse::dateparse(value)
                .ok()
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
        })
        .map_or_else(
            || Field::Invalid(format!("unparsable date {value:?}")),
            Field::Present,
        )
}

/// Validate a mail message and assemble the normalized message.
///
/// Fails with a [`ValidationError`] naming every missing or invalid required
/// field: sender, date and indexable text.
pub fn assemble(
    mail: MailMessage,
    context: &IngestContext,
    config: &ParserConfig,
) -> Result<ParsedMessage> {
    let text = mail.text();

    let mut problems: Vec<FieldProblem> = [mail.from.problem("from"), mail.date.problem("date")]
        .into_iter()
        .flatten()
        .collect();
    if text.is_none() {
        problems.push(FieldProblem::missing("text"));
    }

    let (Field::Present(from), Field::Present(date), Some(text)) = (&mail.from, &mail.date, text)
    else {
        return Err(ValidationError { problems }.into());
    };

    let signals = privacy::analyze(
        &mail.parts,
        &mail.headers,
        context.transport_security,
        &config.spam,
    );
    let privacy_index = config
        .privacy
        .privacy_index(context.message_type, &signals.features);
    let lookup = mail.lookup_sequence();
    let lists = mail.lists();

    debug!(
        "Normalized message: {} from {} ({} parts, content security [{}])",
        mail.subject.as_deref().unwrap_or("(no subject)"),
        from.canonical_address,
        mail.parts.len(),
        signals
            .features
            .content_security
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(",")
    );

    let message = NormalizedMessage {
        message_type: context.message_type,
        from: from.canonical_address.clone(),
        date: *date,
        subject: mail.subject,
        recipients: mail.recipients,
        parts: mail.parts,
        headers: mail.headers,
        size: mail.size,
        text,
        external_message_id: mail.external_message_id,
        external_parent_id: mail.external_parent_id,
        lists,
        privacy_features: signals.features,
        privacy_index,
        spam_level: signals.spam_level,
        degradations: mail.degradations,
    };

    Ok(ParsedMessage { message, lookup })
}
