//! Envelope: the MIME tree of a raw message, detached from `mailparse` types

use std::sync::LazyLock;

use mailparse::body::Body;
use mailparse::{MailHeader, ParsedMail};
use regex::Regex;
use tracing::debug;

use crate::decode::{decode_encoded_words, header_bytes_to_string};
use crate::error::{ParseError, Result};
use crate::raw::RawMessage;

static CHARSET_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|;)\s*charset\s*=\s*"?([^";\s]+)"?"#).expect("charset regex")
});

/// A header exactly as it appeared, value still undecoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeader {
    pub name: String,
    pub value: Vec<u8>,
}

impl RawHeader {
    pub fn new(name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    fn from_mail_header(header: &MailHeader<'_>) -> Self {
        Self {
            name: header.get_key(),
            value: header.get_value_raw().to_vec(),
        }
    }
}

/// Content-Transfer-Encoding of a leaf body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7bit, 8bit and binary: the bytes are the content
    Identity,
    Base64,
    QuotedPrintable,
}

/// A non-multipart MIME node
#[derive(Debug, Clone)]
pub struct LeafNode {
    pub headers: Vec<RawHeader>,
    /// Lowercased MIME type, `text/plain` when undeclared
    pub content_type: String,
    /// Every charset parameter declared for the node, in declaration order
    pub charsets: Vec<String>,
    pub transfer_encoding: TransferEncoding,
    pub filename: Option<String>,
    /// Body bytes before transfer decoding
    pub body: Vec<u8>,
}

impl LeafNode {
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.content_type.contains("text")
    }
}

/// A node of the MIME body tree
#[derive(Debug, Clone)]
pub enum BodyNode {
    Leaf(LeafNode),
    Multipart {
        content_type: String,
        children: Vec<BodyNode>,
    },
}

impl BodyNode {
    /// Number of leaves below this node
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Multipart { children, .. } => children.iter().map(Self::leaf_count).sum(),
        }
    }
}

/// Headers and body tree of a parsed message
#[derive(Debug, Clone)]
pub struct Envelope {
    pub headers: Vec<RawHeader>,
    pub body: BodyNode,
}

impl Envelope {
    /// Parse raw bytes into an envelope.
    ///
    /// Fails with [`ParseError::MalformedEnvelope`] when the bytes carry no
    /// header section or nest multiparts deeper than `max_depth`.
    pub fn parse(raw: &RawMessage, max_depth: usize) -> Result<Self> {
        let malformed = |reason: String| ParseError::MalformedEnvelope {
            raw_id: raw.id().clone(),
            reason,
        };

        let bytes = skip_mbox_separator(raw.bytes());
        let parsed = mailparse::parse_mail(bytes).map_err(|e| malformed(e.to_string()))?;

        if parsed.headers.is_empty() {
            return Err(malformed("no header section".into()));
        }

        let headers = parsed
            .headers
            .iter()
            .map(RawHeader::from_mail_header)
            .collect();
        let body = build_node(&parsed, 0, max_depth).map_err(malformed)?;

        debug!(
            "Parsed envelope {} with {} leaf parts",
            raw.id(),
            body.leaf_count()
        );

        Ok(Self { headers, body })
    }
}

fn build_node(
    part: &ParsedMail<'_>,
    depth: usize,
    max_depth: usize,
) -> std::result::Result<BodyNode, String> {
    let content_type = part.ctype.mimetype.to_lowercase();

    if part.subparts.is_empty() && !content_type.starts_with("multipart/") {
        return Ok(BodyNode::Leaf(build_leaf(part, content_type)));
    }

    if depth >= max_depth {
        return Err(format!("multipart nesting deeper than {max_depth}"));
    }

    let children = part
        .subparts
        .iter()
        .map(|sub| build_node(sub, depth + 1, max_depth))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(BodyNode::Multipart {
        content_type,
        children,
    })
}

fn build_leaf(part: &ParsedMail<'_>, content_type: String) -> LeafNode {
    let (transfer_encoding, body) = match part.get_body_encoded() {
        Body::Base64(body) => (TransferEncoding::Base64, body.get_raw().to_vec()),
        Body::QuotedPrintable(body) => (TransferEncoding::QuotedPrintable, body.get_raw().to_vec()),
        Body::SevenBit(body) | Body::EightBit(body) => {
            (TransferEncoding::Identity, body.get_raw().to_vec())
        }
        Body::Binary(body) => (TransferEncoding::Identity, body.get_raw().to_vec()),
    };

    let headers: Vec<RawHeader> = part.headers.iter().map(RawHeader::from_mail_header).collect();

    LeafNode {
        charsets: declared_charsets(&headers),
        filename: part_filename(part),
        headers,
        content_type,
        transfer_encoding,
        body,
    }
}

/// Charset parameters of every Content-Type header, distinct and in order
fn declared_charsets(headers: &[RawHeader]) -> Vec<String> {
    let mut charsets: Vec<String> = Vec::new();

    for header in headers
        .iter()
        .filter(|h| h.name.eq_ignore_ascii_case("content-type"))
    {
        let value = header_bytes_to_string(&header.value);
        for cap in CHARSET_PARAM.captures_iter(&value) {
            let charset = cap[1].to_lowercase();
            if !charsets.contains(&charset) {
                charsets.push(charset);
            }
        }
    }

    charsets
}

fn part_filename(part: &ParsedMail<'_>) -> Option<String> {
    let disposition = part.get_content_disposition();
    disposition
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
        .map(|name| decode_encoded_words(name).value)
}

/// Drop a leading mbox `From ` separator line and UTF-8 BOM
fn skip_mbox_separator(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ")
        && let Some(pos) = data.iter().position(|&b| b == b'\n')
    {
        return &data[pos + 1..];
    }
    data
}
