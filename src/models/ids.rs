use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a card, such as `1`, `1a`, `A3` or `Z12`.
///
/// Ids are allocated once and never reused, so they double as the card's
/// file stem and as the key in every state document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    /// Sentinel returned by the allocator when no rule matches a category.
    pub const UNKNOWN: &'static str = "unknown";

    /// Creates a card id from its textual form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the sentinel id for unmatched categories.
    pub fn unknown() -> Self {
        Self::new(Self::UNKNOWN)
    }

    /// Returns true for the unmatched-category sentinel.
    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the trailing run of ASCII digits parsed as a number.
    ///
    /// `"A12"` yields `Some(12)`, `"7"` yields `Some(7)`, `"1a"` yields `None`.
    pub fn numeric_suffix(&self) -> Option<u64> {
        let digits = self.0.chars().rev().take_while(char::is_ascii_digit).count();
        self.0[self.0.len() - digits..].parse().ok()
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CardId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for CardId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
