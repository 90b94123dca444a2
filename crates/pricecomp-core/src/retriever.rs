use async_trait::async_trait;
use thiserror::Error;

use crate::listing::Listing;
use crate::region::Region;

/// Failure of a single source. Absorbed by the aggregator, never surfaced to
/// the caller of a search.
#[derive(Debug, Error)]
pub enum RetrieverError {
    #[error("request to {source_name} failed: {message}")]
    Transport { source_name: String, message: String },

    #[error("{source_name} rate limited the request")]
    RateLimited { source_name: String },

    #[error("{source_name} returned unexpected status {status}")]
    UnexpectedStatus { source_name: String, status: u16 },

    #[error("could not parse {source_name} response: {message}")]
    Parse { source_name: String, message: String },
}

/// Regions in which a retriever participates in a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coverage {
    /// Consulted for every region.
    Global,
    /// Consulted only for the listed regions.
    Regions(Vec<Region>),
}

impl Coverage {
    #[must_use]
    pub fn regions<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Regions(
            codes
                .into_iter()
                .filter_map(|code| Region::parse(code.as_ref()))
                .collect(),
        )
    }

    #[must_use]
    pub fn includes(&self, region: &Region) -> bool {
        match self {
            Self::Global => true,
            Self::Regions(regions) => regions.contains(region),
        }
    }
}

/// A source-specific collaborator turning `(query, region)` into listings.
///
/// Implementations hold no mutable state shared with other retrievers. A
/// region the source does not serve yields `Ok(vec![])`. Callers cancel an
/// in-flight search by dropping the future.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Stable display name, e.g. `"Amazon"`.
    fn name(&self) -> &str;

    /// Fetches listings for `query` in `region`.
    ///
    /// # Errors
    ///
    /// Returns [`RetrieverError`] on transport, status or parse failures.
    async fn search(&self, query: &str, region: &Region) -> Result<Vec<Listing>, RetrieverError>;
}
