//! Privacy and spam signals of a message

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::headers::HeaderTable;
use crate::types::{ContentSecurity, MessagePart, MessageType, PrivacyFeatures};

/// Scoring table for the privacy index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    /// Base score per message type name (`mail`, ...); unknown types score 0
    pub message_type_scores: BTreeMap<String, i64>,

    /// Added when the content is PGP encrypted
    pub pgp_bonus: i64,

    /// Added when the message travelled over an encrypted transport
    pub transport_bonus: i64,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            message_type_scores: BTreeMap::from([(MessageType::Mail.as_str().to_string(), 10)]),
            pgp_bonus: 20,
            transport_bonus: 10,
        }
    }
}

impl PrivacyConfig {
    /// Additive privacy index; no upper bound is enforced
    #[must_use]
    pub fn privacy_index(&self, message_type: MessageType, features: &PrivacyFeatures) -> i64 {
        let mut index = self
            .message_type_scores
            .get(message_type.as_str())
            .copied()
            .unwrap_or(0);

        if features.has(ContentSecurity::Pgp) {
            index += self.pgp_bonus;
        }
        if features.transport_security == Some(true) {
            index += self.transport_bonus;
        }
        index
    }
}

/// Mapping of the `X-Spam-Score` header onto a 0-100 spam level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpamPolicy {
    /// Scores below this are clean
    pub low: f64,
    /// Scores from this up are certain spam
    pub high: f64,
    /// Multiplier applied to scores in `[low, high)`
    pub factor: f64,
}

impl Default for SpamPolicy {
    fn default() -> Self {
        Self {
            low: 5.0,
            high: 15.0,
            factor: 10.0,
        }
    }
}

impl SpamPolicy {
    pub const MAX_LEVEL: f64 = 100.0;

    /// `[.., low)` -> 0, `[low, high)` -> `score * factor` capped at 100, `[high, ..)` -> 100
    #[must_use]
    pub fn level(&self, score: f64) -> f64 {
        if score < self.low {
            0.0
        } else if score < self.high {
            (score * self.factor).min(Self::MAX_LEVEL)
        } else {
            Self::MAX_LEVEL
        }
    }

    /// Spam level of a header table; a missing, unparsable or NaN score counts as 0
    #[must_use]
    pub fn level_of(&self, headers: &HeaderTable) -> f64 {
        let score = headers
            .first("X-Spam-Score")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|s| !s.is_nan())
            .unwrap_or(0.0);
        self.level(score)
    }
}

/// Everything the analyzer derives from parts and headers
#[derive(Debug, Clone, PartialEq)]
pub struct Signals {
    pub features: PrivacyFeatures,
    pub spam_level: f64,
}

/// Content security tags found in the part content types
#[must_use]
pub fn content_security(parts: &[MessagePart]) -> BTreeSet<ContentSecurity> {
    let mut found = BTreeSet::new();
    for part in parts {
        if part.content_type.contains("pgp-encrypted") {
            found.insert(ContentSecurity::Pgp);
        }
        if part.content_type.contains("pgp-signature") {
            found.insert(ContentSecurity::PgpSigned);
        }
    }
    found
}

/// Derive privacy features and spam level. Never fails.
#[must_use]
pub fn analyze(
    parts: &[MessagePart],
    headers: &HeaderTable,
    transport_security: Option<bool>,
    spam: &SpamPolicy,
) -> Signals {
    Signals {
        features: PrivacyFeatures {
            transport_security,
            content_security: content_security(parts),
        },
        spam_level: spam.level_of(headers),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PartData;

    fn part(content_type: &str) -> MessagePart {
        MessagePart {
            content_type: content_type.to_string(),
            filename: None,
            size: 0,
            can_index: false,
            charset: None,
            data: PartData::Binary(Vec::new()),
        }
    }

    #[test]
    fn negative_score_is_clean() {
        assert!(SpamPolicy::default().level(-3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_numeric_score_is_clean() {
        let headers: HeaderTable = [("X-Spam-Score", "high")].into_iter().collect();
        assert!(SpamPolicy::default().level_of(&headers).abs() < f64::EPSILON);
    }

    #[test]
    fn infinite_scores_saturate() {
        let level = |score: &str| {
            let headers: HeaderTable = [("X-Spam-Score", score)].into_iter().collect();
            SpamPolicy::default().level_of(&headers)
        };
        assert!((level("inf") - 100.0).abs() < f64::EPSILON);
        assert!(level("-inf").abs() < f64::EPSILON);
        assert!(level("NaN").abs() < f64::EPSILON);
    }

    #[test]
    fn only_first_score_counts() {
        let headers: HeaderTable = [("X-Spam-Score", "6"), ("X-Spam-Score", "20")]
            .into_iter()
            .collect();
        assert!((SpamPolicy::default().level_of(&headers) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn pgp_tags_from_content_types() {
        let found = content_security(&[
            part("multipart/encrypted"),
            part("application/pgp-encrypted"),
            part("application/pgp-signature"),
        ]);
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec![ContentSecurity::Pgp, ContentSecurity::PgpSigned]
        );
    }

    #[test]
    fn unknown_transport_adds_nothing() {
        let features = PrivacyFeatures::default();
        assert_eq!(
            PrivacyConfig::default().privacy_index(MessageType::Mail, &features),
            10
        );
    }
}
