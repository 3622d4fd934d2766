//! Address normalization for recipient resolution

use mailparse::{MailAddr, MailAddrList, SingleInfo};
use tracing::warn;

use crate::decode::{decode_encoded_words, header_bytes_to_string};
use crate::envelope::RawHeader;
use crate::error::{ParseError, Result};
use crate::types::{RecipientAddress, RecipientRole};

/// Clean an email address for recipient resolution.
///
/// Returns `(canonical, original)`: the canonical form is lowercased with any
/// `+extension` removed from the local part, the original is the bare address
/// exactly as written. `"Jane" <Jane+work@Example.COM>` gives
/// `("jane@example.com", "Jane+work@Example.COM")`.
pub fn clean_email_address(raw: &str) -> Result<(String, String)> {
    let address = bare_address(raw);
    let invalid = || ParseError::InvalidAddress(raw.trim().to_string());

    let (local, domain) = address.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || address.contains(char::is_whitespace)
    {
        return Err(invalid());
    }

    let local = local.to_lowercase();
    let local = match local.split_once('+') {
        Some((name, _extension)) if !name.is_empty() => name,
        _ => local.as_str(),
    };

    Ok((
        format!("{local}@{}", domain.to_lowercase()),
        address.to_string(),
    ))
}

/// The part between angle brackets when present, else the trimmed input
fn bare_address(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(start) = trimmed.rfind('<')
        && let Some(len) = trimmed[start..].find('>')
    {
        return trimmed[start + 1..start + len].trim();
    }
    trimmed
}

/// Parse every address of an address-list value, keeping failures in place.
///
/// Group syntax is flattened. When the value is not a valid RFC 5322 address
/// list it is split on commas instead. The value must not be RFC 2047
/// decoded yet, see [`parse_address_header`].
#[must_use]
pub fn parse_address_list(value: &str, role: RecipientRole) -> Vec<Result<RecipientAddress>> {
    match mailparse::addrparse(value) {
        Ok(list) => flatten(&list, role),
        Err(_) => split_on_commas(value, role),
    }
}

/// Parse the addresses of a raw, undecoded header.
///
/// The list is split before encoded words are decoded, so an encoded display
/// name holding a comma (`=?utf-8?q?Doe,_John?= <john@example.com>`) stays
/// one address.
#[must_use]
pub fn parse_address_header(
    header: &RawHeader,
    role: RecipientRole,
) -> Vec<Result<RecipientAddress>> {
    let mut line = format!("{}: ", header.name).into_bytes();
    line.extend_from_slice(&header.value);

    let parsed = mailparse::parse_header(&line)
        .and_then(|(mail_header, _)| mailparse::addrparse_header(&mail_header));

    match parsed {
        Ok(list) => flatten(&list, role),
        Err(_) => {
            let text = header_bytes_to_string(&header.value).replace(['\r', '\n'], "");
            split_on_commas(&decode_encoded_words(&text).value, role)
        }
    }
}

/// Parse an address-list value, dropping entries that are not valid addresses
#[must_use]
pub fn parse_recipients(value: &str, role: RecipientRole) -> Vec<RecipientAddress> {
    keep_valid(parse_address_list(value, role), role)
}

/// Parse a raw address header, dropping entries that are not valid addresses
#[must_use]
pub fn parse_recipient_header(header: &RawHeader, role: RecipientRole) -> Vec<RecipientAddress> {
    keep_valid(parse_address_header(header, role), role)
}

fn keep_valid(parsed: Vec<Result<RecipientAddress>>, role: RecipientRole) -> Vec<RecipientAddress> {
    parsed
        .into_iter()
        .filter_map(|parsed| match parsed {
            Ok(recipient) => Some(recipient),
            Err(e) => {
                warn!("Dropping {} recipient: {e}", role.header_name());
                None
            }
        })
        .collect()
}

fn flatten(list: &MailAddrList, role: RecipientRole) -> Vec<Result<RecipientAddress>> {
    list.iter()
        .flat_map(|addr| match addr {
            MailAddr::Single(info) => vec![info],
            MailAddr::Group(group) => group.addrs.iter().collect(),
        })
        .map(|info| from_single_info(info, role))
        .collect()
}

fn split_on_commas(value: &str, role: RecipientRole) -> Vec<Result<RecipientAddress>> {
    value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| RecipientAddress::parse(s, role))
        .collect()
}

fn from_single_info(info: &SingleInfo, role: RecipientRole) -> Result<RecipientAddress> {
    let (canonical_address, raw_address) = clean_email_address(&info.addr)?;
    Ok(RecipientAddress {
        canonical_address,
        raw_address,
        display_name: info
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from),
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_address_inside_brackets() {
        assert_eq!(bare_address("\"Jane\" <jane@example.com>"), "jane@example.com");
        assert_eq!(bare_address("  jane@example.com "), "jane@example.com");
        assert_eq!(bare_address("<jane@example.com>"), "jane@example.com");
    }

    #[test]
    fn encoded_display_name_comma_does_not_split() {
        let header = RawHeader::new(
            "To",
            "=?utf-8?q?Doe,_John?= <John+x@Example.com>, b@example.org",
        );
        let parsed: Vec<RecipientAddress> = parse_address_header(&header, RecipientRole::To)
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].canonical_address, "john@example.com");
        assert_eq!(parsed[0].display_name.as_deref(), Some("Doe, John"));
        assert_eq!(parsed[1].canonical_address, "b@example.org");
    }

    #[test]
    fn plus_only_local_part_is_kept() {
        let (canonical, _) = clean_email_address("+tag@example.com").unwrap();
        assert_eq!(canonical, "+tag@example.com");
    }

    #[test]
    fn extension_split_on_first_plus() {
        let (canonical, original) = clean_email_address("a+b+c@X.org").unwrap();
        assert_eq!(canonical, "a@x.org");
        assert_eq!(original, "a+b+c@X.org");
    }
}
