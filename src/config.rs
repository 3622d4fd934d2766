//! Parser configuration.
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```toml
//! max_depth = 32
//!
//! [privacy]
//! pgp_bonus = 20
//! transport_bonus = 10
//!
//! [privacy.message_type_scores]
//! mail = 10
//!
//! [spam]
//! low = 5.0
//! high = 15.0
//! factor = 10.0
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, Result};
use crate::privacy::{PrivacyConfig, SpamPolicy};

/// Tunables of the normalization engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Privacy index scoring table
    pub privacy: PrivacyConfig,
    /// Spam score to spam level mapping
    pub spam: SpamPolicy,
    /// Deepest multipart nesting accepted before the envelope counts as malformed
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            privacy: PrivacyConfig::default(),
            spam: SpamPolicy::default(),
            max_depth: 32,
        }
    }
}

impl ParserConfig {
    /// Load a configuration from TOML, missing keys keep their defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ParseError::Config(e.to_string()))?;
        if config.max_depth == 0 {
            return Err(ParseError::Config("max_depth must be at least 1".into()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(ParserConfig::from_toml_str("").unwrap(), ParserConfig::default());
    }

    #[test]
    fn zero_depth_is_rejected() {
        assert!(matches!(
            ParserConfig::from_toml_str("max_depth = 0"),
            Err(ParseError::Config(_))
        ));
    }

    #[test]
    fn bad_types_are_reported() {
        assert!(ParserConfig::from_toml_str("[spam]\nlow = \"five\"").is_err());
    }
}
