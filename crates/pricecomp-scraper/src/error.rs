use pricecomp_core::RetrieverError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid CSS selector \"{selector}\": {reason}")]
    Selector { selector: String, reason: String },
}

impl ScraperError {
    /// Converts into the retriever contract's error, tagged with the site name.
    #[must_use]
    pub fn into_retriever_error(self, source_name: &str) -> RetrieverError {
        let source_name = source_name.to_string();
        match self {
            Self::Http(e) => RetrieverError::Transport {
                source_name,
                message: e.to_string(),
            },
            Self::RateLimited { .. } => RetrieverError::RateLimited { source_name },
            Self::UnexpectedStatus { status, .. } => RetrieverError::UnexpectedStatus {
                source_name,
                status,
            },
            e @ (Self::InvalidUrl { .. } | Self::Selector { .. }) => RetrieverError::Parse {
                source_name,
                message: e.to_string(),
            },
        }
    }
}
