use serde::{Deserialize, Serialize};

use crate::listing::Listing;
use crate::request::{Filter, SortSpec};

/// One page of aggregated, filtered and sorted listings.
///
/// This is also the value stored in the search cache, so it round-trips
/// through JSON unchanged apart from `duration_ms` and `cached`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub products: Vec<Listing>,
    /// Listings remaining after filtering, before pagination.
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    /// Human-readable list of the sources consulted for the region.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
    pub duration_ms: u64,
    #[serde(default)]
    pub cached: bool,
}

/// `ceil(total / limit)`, saturating at `u32::MAX`.
#[must_use]
pub fn total_pages(total: usize, limit: u32) -> u32 {
    if limit == 0 {
        return 0;
    }
    let pages = total.div_ceil(limit as usize);
    u32::try_from(pages).unwrap_or(u32::MAX)
}
