//! Normalization pipeline: raw bytes to [`ParsedMessage`]

use tracing::{debug, warn};

use crate::config::ParserConfig;
use crate::envelope::Envelope;
use crate::error::Result;
use crate::message::{MailMessage, assemble};
use crate::raw::{RawMessage, RawMessageId};
use crate::types::{IngestContext, ParsedMessage};

/// Parse and normalize a raw message.
///
/// Decode problems in single headers or parts are absorbed and listed in
/// `degradations`; a broken envelope, conflicting charsets or missing
/// required fields fail the whole message.
pub fn parse_message(
    raw: &RawMessage,
    context: &IngestContext,
    config: &ParserConfig,
) -> Result<ParsedMessage> {
    let envelope = Envelope::parse(raw, config.max_depth)?;
    let mail = MailMessage::from_envelope(&envelope, raw.len())?;

    if !mail.degradations.is_empty() {
        warn!(
            "Raw message {} parsed with {} degraded decodes",
            raw.id(),
            mail.degradations.len()
        );
    }

    let parsed = assemble(mail, context, config)?;
    debug!(
        "Raw message {} normalized with {} lookup keys",
        raw.id(),
        parsed.lookup.len()
    );
    Ok(parsed)
}

/// Parse raw mail bytes with the default context and configuration
pub fn parse_email(raw: &[u8]) -> Result<ParsedMessage> {
    let raw = RawMessage::new(RawMessageId::new("inline"), raw);
    parse_message(&raw, &IngestContext::default(), &ParserConfig::default())
}
