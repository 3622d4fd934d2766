//! Header grouping: repeated headers collapse under one normalized name

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::decode::{Degradation, decode_encoded_words, header_bytes_to_string};
use crate::envelope::RawHeader;

/// Header name -> decoded values, in order of occurrence
///
/// Names are stored in canonical case (`X-Spam-Score`, `List-Id`) and every
/// lookup normalizes its argument the same way.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct HeaderTable(BTreeMap<String, Vec<String>>);

impl HeaderTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value after any existing values of the same header
    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.0
            .entry(normalize_name(name))
            .or_default()
            .push(value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(&normalize_name(name)).map(Vec::as_slice)
    }

    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(<[String]>::first)
            .map(String::as_str)
    }

    /// All values of a header, empty when absent
    #[must_use]
    pub fn all(&self, name: &str) -> &[String] {
        self.get(name).unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&normalize_name(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for HeaderTable {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, value) in iter {
            table.push(name, value);
        }
        table
    }
}

/// Canonical header name: dash-separated words, first letter upper, rest lower
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Group raw headers and decode their values.
///
/// A value that cannot be decoded cleanly keeps whatever could be recovered
/// and the problem is returned as a [`Degradation`]; grouping never fails.
#[must_use]
pub fn group_headers(headers: &[RawHeader]) -> (HeaderTable, Vec<Degradation>) {
    let mut table = HeaderTable::new();
    let mut degradations = Vec::new();

    for header in headers {
        let text = unfold(&header_bytes_to_string(&header.value));
        let (value, degradation) =
            decode_encoded_words(text.trim()).located(|| format!("header {}", header.name));

        if let Some(degradation) = degradation {
            warn!("Degraded header decode: {degradation}");
            degradations.push(degradation);
        }
        table.push(&header.name, value);
    }

    (table, degradations)
}

/// Remove the line breaks of folded header lines, keeping the folding whitespace
fn unfold(value: &str) -> String {
    value.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}
