//! Search orchestration for pricecomp.
//!
//! [`SearchService`] validates a request, consults the [`SearchCache`], and on
//! a miss fans the query out to every retriever in the [`SourceTable`] that
//! covers the request region, then filters, sorts and paginates the merged
//! listings.

pub mod aggregator;
pub mod cache;
pub mod orchestrator;
pub mod pipeline;
pub mod sources;

pub use aggregator::{Aggregate, Aggregator, OutcomeStatus, SourceOutcome};
pub use cache::{CacheError, CacheKey, CacheStats, CacheStore, MemoryStore, SearchCache};
pub use orchestrator::SearchService;
pub use pipeline::{filter_listings, paginate, sort_listings, Page};
pub use sources::SourceTable;
