use thiserror::Error;

/// Rejection of a caller-supplied search request.
///
/// These are the only errors that cross the orchestrator boundary; source and
/// cache failures degrade to fewer results instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("search query cannot be empty")]
    EmptyQuery,

    #[error("minimum price cannot be negative")]
    NegativeMinPrice,

    #[error("maximum price cannot be negative")]
    NegativeMaxPrice,

    #[error("maximum price cannot be less than minimum price")]
    InvertedPriceRange,

    #[error("{0} must be a finite number")]
    NonFinite(&'static str),

    #[error("minimum rating must be between 0 and 5")]
    RatingOutOfRange,

    #[error("invalid sort field: {0}. Valid fields: price, rating, name")]
    InvalidSortField(String),

    #[error("invalid sort order: {0}. Valid orders: asc, desc")]
    InvalidSortOrder(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
