//! Identifier types for rate sources.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of an upstream rate source (a scraped site, a public API, a CLI
/// export). Used as part of cache keys and unit-correction lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(String);

impl SourceId {
    /// Create a new source ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().to_ascii_lowercase())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bonbast CLI export.
    pub fn bonbast() -> Self {
        Self::new("bonbast")
    }

    /// alanchand.com scrape.
    pub fn alanchand() -> Self {
        Self::new("alanchand")
    }

    /// tgju.org scrape.
    pub fn tgju() -> Self {
        Self::new("tgju")
    }

    /// open.er-api.com public API.
    pub fn open_er_api() -> Self {
        Self::new("open-er-api")
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Family a source belongs to. Decides cache TTL and where in the
/// resolution chain the source is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceFamily {
    /// Unofficial quotes for IRT pairs.
    BlackMarket,
    /// Public exchange-rate API for everything else.
    General,
}

impl fmt::Display for SourceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFamily::BlackMarket => write!(f, "black-market"),
            SourceFamily::General => write!(f, "general"),
        }
    }
}
