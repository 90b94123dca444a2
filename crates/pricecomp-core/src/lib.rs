//! Shared domain types for pricecomp.
//!
//! Holds the listing/request/response model, the price and rating normalizer,
//! the [`Retriever`] contract every source implements, request validation,
//! and environment-driven application configuration.

pub mod app_config;
pub mod config;
pub mod error;
pub mod listing;
pub mod normalize;
pub mod region;
pub mod request;
pub mod response;
pub mod retriever;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, ValidationError};
pub use listing::Listing;
pub use normalize::{normalize_listings, parse_price, parse_rating};
pub use region::Region;
pub use request::{
    Filter, SearchRequest, SortField, SortOrder, SortParams, SortSpec, ValidatedRequest,
    DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT,
};
pub use response::{total_pages, SearchResponse};
pub use retriever::{Coverage, Retriever, RetrieverError};
