use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Number of characters in a generated short key.
pub const KEY_LENGTH: usize = 3;

/// A case-normalized short key identifying a URL record.
///
/// Keys are always stored lowercase. Lookups go through [`ShortKey::parse`],
/// which lowercases the caller's input, so `"AB1"` and `"ab1"` address the
/// same record.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortKey(String);

impl ShortKey {
    /// Parses caller-supplied input into a key.
    ///
    /// Only emptiness is rejected here. A key of the wrong shape is still a
    /// valid lookup target; it simply never matches a stored record.
    pub fn parse(input: impl AsRef<str>) -> Result<Self> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidShortKey(
                "Key value required.".to_string(),
            ));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    /// Wraps a key produced by a trusted internal source.
    ///
    /// The value is still lowercased so the stored form stays normalized.
    pub fn new_unchecked(key: impl Into<String>) -> Self {
        Self(key.into().to_lowercase())
    }

    /// Returns `true` when the key has the generated shape: exactly
    /// [`KEY_LENGTH`] ASCII alphanumeric characters.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == KEY_LENGTH && self.0.chars().all(|c| c.is_ascii_alphanumeric())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the resource path of this key under the given route prefix.
    pub fn to_path(&self, prefix: &str) -> String {
        format!("{}/{}", prefix.trim_end_matches('/'), self.0)
    }
}

impl Display for ShortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
