//! Best-effort decoding: charsets, RFC 2047 encoded words and transfer encodings.
//!
//! Nothing in here fails. Every decoder hands back a [`Decoded`] value whose
//! `issue` records what had to be substituted, so callers can keep going and
//! still report the degradation.

use std::borrow::Cow;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base64 engine that accepts missing padding and stray trailing bits
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Why a value could only be decoded partially
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DecodeIssue {
    /// The declared charset is not known, UTF-8 was used instead
    UnknownCharset(String),
    /// Byte sequences invalid for the charset were replaced by U+FFFD
    MalformedBytes(String),
    /// The transfer encoding could not be undone, raw bytes were kept
    InvalidTransferEncoding(String),
    /// An RFC 2047 encoded word could not be decoded and was kept verbatim
    InvalidEncodedWord(String),
}

impl fmt::Display for DecodeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCharset(cs) => write!(f, "unknown charset {cs}"),
            Self::MalformedBytes(cs) => write!(f, "malformed {cs} byte sequence"),
            Self::InvalidTransferEncoding(enc) => write!(f, "invalid {enc} payload"),
            Self::InvalidEncodedWord(word) => write!(f, "undecodable encoded word {word}"),
        }
    }
}

/// A decode degradation attached to the place it happened
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Degradation {
    /// Header name or part position, e.g. `header Subject` or `part 2 (text/plain)`
    pub location: String,
    pub issue: DecodeIssue,
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.issue)
    }
}

/// A decoded value and, when decoding was lossy, the first issue met
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<T> {
    pub value: T,
    pub issue: Option<DecodeIssue>,
}

impl<T> Decoded<T> {
    pub const fn clean(value: T) -> Self {
        Self { value, issue: None }
    }

    pub const fn degraded(value: T, issue: DecodeIssue) -> Self {
        Self {
            value,
            issue: Some(issue),
        }
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.issue.is_some()
    }

    /// Split into the value and a located degradation, if any
    pub fn located(self, location: impl FnOnce() -> String) -> (T, Option<Degradation>) {
        let degradation = self.issue.map(|issue| Degradation {
            location: location(),
            issue,
        });
        (self.value, degradation)
    }
}

/// Resolve a MIME charset label, ignoring an RFC 2231 language suffix
fn lookup_charset(label: &str) -> Option<&'static Encoding> {
    let label = label.split('*').next().unwrap_or(label).trim();
    Encoding::for_label_no_replacement(label.as_bytes())
}

/// Decode bytes with a declared charset, substituting U+FFFD for bad sequences.
///
/// Without a charset the bytes are read as UTF-8.
#[must_use]
pub fn decode_text(bytes: &[u8], charset: Option<&str>) -> Decoded<String> {
    let Some(label) = charset else {
        return decode_with(UTF_8, bytes);
    };

    match lookup_charset(label) {
        Some(encoding) => decode_with(encoding, bytes),
        None => {
            let fallback = decode_with(UTF_8, bytes);
            Decoded::degraded(fallback.value, DecodeIssue::UnknownCharset(label.to_string()))
        }
    }
}

fn decode_with(encoding: &'static Encoding, bytes: &[u8]) -> Decoded<String> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        Decoded::degraded(
            text.into_owned(),
            DecodeIssue::MalformedBytes(encoding.name().to_lowercase()),
        )
    } else {
        Decoded::clean(text.into_owned())
    }
}

/// Raw header bytes to text: UTF-8 when valid, otherwise Windows-1252 which accepts every byte
#[must_use]
pub fn header_bytes_to_string(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            let (decoded, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            decoded
        }
    }
}

/// Decode RFC 2047 encoded words in a header value.
///
/// `=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?=` becomes `Hola mundo`; whitespace
/// between adjacent encoded words is dropped. A word with an unknown charset
/// or a broken payload is kept verbatim. Text that only looks like the start
/// of an encoded word is kept as is.
#[must_use]
pub fn decode_encoded_words(input: &str) -> Decoded<String> {
    let mut result = String::with_capacity(input.len());
    let mut issue = None;
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];
        match split_encoded_word(after_start) {
            Some(word) => {
                let decoded = decode_word(&word);
                if issue.is_none() {
                    issue = decoded.issue;
                }
                result.push_str(&decoded.value);
                remaining = &after_start[word.consumed..];
                last_was_encoded = true;
            }
            None => {
                result.push_str("=?");
                remaining = after_start;
                last_was_encoded = false;
            }
        }
    }

    result.push_str(remaining);
    Decoded {
        value: result,
        issue,
    }
}

struct EncodedWord<'a> {
    charset: &'a str,
    encoding: &'a str,
    text: &'a str,
    /// Bytes consumed after the opening `=?`
    consumed: usize,
}

impl EncodedWord<'_> {
    fn verbatim(&self) -> String {
        format!("=?{}?{}?{}?=", self.charset, self.encoding, self.text)
    }
}

fn split_encoded_word(s: &str) -> Option<EncodedWord<'_>> {
    let first_q = s.find('?')?;
    let charset = &s[..first_q];
    if charset.is_empty() || charset.contains(char::is_whitespace) {
        return None;
    }

    let rest = &s[first_q + 1..];
    let second_q = rest.find('?')?;
    let encoding = &rest[..second_q];
    if encoding.len() != 1 {
        return None;
    }

    let rest = &rest[second_q + 1..];
    let end = rest.find("?=")?;
    let text = &rest[..end];
    if text.contains(char::is_whitespace) {
        return None;
    }

    Some(EncodedWord {
        charset,
        encoding,
        text,
        consumed: first_q + 1 + second_q + 1 + end + 2,
    })
}

fn decode_word(word: &EncodedWord<'_>) -> Decoded<String> {
    if lookup_charset(word.charset).is_none() {
        return Decoded::degraded(
            word.verbatim(),
            DecodeIssue::UnknownCharset(word.charset.to_string()),
        );
    }

    let bytes = match word.encoding {
        "B" | "b" => LENIENT_BASE64.decode(word.text).ok(),
        "Q" | "q" => decode_q_encoding(word.text),
        _ => None,
    };

    match bytes {
        Some(bytes) => decode_text(&bytes, Some(word.charset)),
        None => Decoded::degraded(
            word.verbatim(),
            DecodeIssue::InvalidEncodedWord(word.verbatim()),
        ),
    }
}

/// Q encoding (RFC 2047 §4.2): underscores are spaces, `=XX` is a byte
fn decode_q_encoding(input: &str) -> Option<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' => {
                result.push(hex_pair(bytes.get(i + 1..i + 3)?)?);
                i += 3;
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    Some(result)
}

fn hex_pair(pair: &[u8]) -> Option<u8> {
    let hi = char::from(pair[0]).to_digit(16)?;
    let lo = char::from(pair[1]).to_digit(16)?;
    u8::try_from(hi * 16 + lo).ok()
}

/// Undo a base64 body encoding; line breaks and other whitespace are skipped
#[must_use]
pub fn decode_base64_body(encoded: &[u8]) -> Decoded<Vec<u8>> {
    let compact: Vec<u8> = encoded
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    match LENIENT_BASE64.decode(&compact) {
        Ok(bytes) => Decoded::clean(bytes),
        Err(_) => Decoded::degraded(
            encoded.to_vec(),
            DecodeIssue::InvalidTransferEncoding("base64".into()),
        ),
    }
}

/// Undo a quoted-printable body encoding (RFC 2045 §6.7).
///
/// Soft line breaks are removed; an `=` not followed by two hex digits is kept
/// literally and reported.
#[must_use]
pub fn decode_quoted_printable_body(encoded: &[u8]) -> Decoded<Vec<u8>> {
    let mut result = Vec::with_capacity(encoded.len());
    let mut malformed = false;
    let mut i = 0;

    while i < encoded.len() {
        if encoded[i] != b'=' {
            result.push(encoded[i]);
            i += 1;
            continue;
        }

        let rest = &encoded[i + 1..];
        if rest.starts_with(b"\r\n") {
            i += 3;
        } else if rest.starts_with(b"\n") {
            i += 2;
        } else if let Some(byte) = rest.get(..2).and_then(hex_pair) {
            result.push(byte);
            i += 3;
        } else {
            malformed = true;
            result.push(b'=');
            i += 1;
        }
    }

    if malformed {
        Decoded::degraded(
            result,
            DecodeIssue::InvalidTransferEncoding("quoted-printable".into()),
        )
    } else {
        Decoded::clean(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_words_b_and_q() {
        let decoded = decode_encoded_words("=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?=");
        assert_eq!(decoded.value, "Hola mundo");
        assert!(!decoded.is_degraded());

        let decoded = decode_encoded_words("=?ISO-8859-1?Q?caf=E9_cr=E8me?=");
        assert_eq!(decoded.value, "café crème");
    }

    #[test]
    fn plain_text_is_untouched() {
        let decoded = decode_encoded_words("what =? is this");
        assert_eq!(decoded.value, "what =? is this");
        assert!(decoded.issue.is_none());
    }

    #[test]
    fn text_between_words_is_kept() {
        let decoded = decode_encoded_words("Re: =?utf-8?q?h=C3=A9llo?= world");
        assert_eq!(decoded.value, "Re: héllo world");
    }

    #[test]
    fn unknown_charset_degrades() {
        let decoded = decode_encoded_words("Re: =?x-klingon?Q?abc?=");
        assert_eq!(decoded.value, "Re: =?x-klingon?Q?abc?=");
        assert_eq!(
            decoded.issue,
            Some(DecodeIssue::UnknownCharset("x-klingon".into()))
        );
    }

    #[test]
    fn broken_q_word_is_kept_verbatim() {
        let decoded = decode_encoded_words("=?utf-8?Q?bad=Z?=");
        assert_eq!(decoded.value, "=?utf-8?Q?bad=Z?=");
        assert!(matches!(
            decoded.issue,
            Some(DecodeIssue::InvalidEncodedWord(_))
        ));
    }

    #[test]
    fn malformed_utf8_is_replaced() {
        let decoded = decode_text(b"ok \xff\xfe done", Some("utf-8"));
        assert_eq!(decoded.value, "ok \u{fffd}\u{fffd} done");
        assert_eq!(
            decoded.issue,
            Some(DecodeIssue::MalformedBytes("utf-8".into()))
        );
    }

    #[test]
    fn latin1_decodes() {
        let decoded = decode_text(b"caf\xe9", Some("iso-8859-1"));
        assert_eq!(decoded.value, "café");
        assert!(!decoded.is_degraded());
    }

    #[test]
    fn header_bytes_fall_back_to_windows_1252() {
        assert_eq!(header_bytes_to_string(b"plain"), "plain");
        assert_eq!(header_bytes_to_string(b"caf\xe9"), "café");
    }

    #[test]
    fn base64_body_ignores_line_breaks() {
        let decoded = decode_base64_body(b"SGVsbG8s\r\nIHdvcmxk\r\n");
        assert_eq!(decoded.value, b"Hello, world");
        assert!(!decoded.is_degraded());
    }

    #[test]
    fn invalid_base64_body_keeps_raw_bytes() {
        let decoded = decode_base64_body(b"!!not base64!!");
        assert_eq!(decoded.value, b"!!not base64!!");
        assert!(decoded.is_degraded());
    }

    #[test]
    fn quoted_printable_body() {
        let decoded = decode_quoted_printable_body(b"caf=C3=A9 soft=\r\nbreak");
        assert_eq!(decoded.value, "café softbreak".as_bytes());
        assert!(!decoded.is_degraded());

        let decoded = decode_quoted_printable_body(b"50=% off");
        assert_eq!(decoded.value, b"50=% off");
        assert!(decoded.is_degraded());
    }
}
