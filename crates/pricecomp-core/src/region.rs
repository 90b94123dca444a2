use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper-cased market/country code, e.g. `"US"` or `"IN"`.
///
/// Gates which retrievers participate in a search and which storefront and
/// currency a retriever uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region(String);

impl Region {
    /// Builds a region from caller input, trimming and upper-casing it.
    ///
    /// Returns `None` when the input is blank so callers can substitute the
    /// configured fallback region.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_ascii_uppercase()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
