//! Shared HTTP client for storefront search pages.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};

use crate::error::ScraperError;
use crate::retry::retry_with_backoff;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Fetches HTML with a browser-like `Accept` header, a per-request timeout,
/// and backoff on 429s and network failures.
///
/// One instance is shared by every [`crate::SiteRetriever`]; `reqwest::Client`
/// pools connections internally.
pub struct HttpFetcher {
    client: Client,
    /// Additional attempts after the first failure.
    max_retries: u32,
    backoff_base_ms: u64,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_ms: backoff_base_secs.saturating_mul(1000),
        })
    }

    /// GETs `url` and returns the response body.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RateLimited`] on HTTP 429 after retries are exhausted.
    /// - [`ScraperError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`ScraperError::Http`] on network or TLS failure after retries.
    pub async fn fetch_html(&self, url: &Url) -> Result<String, ScraperError> {
        let referer = origin_of(url);
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            let referer = referer.clone();
            async move {
                let response = self
                    .client
                    .get(url.clone())
                    .header(
                        reqwest::header::ACCEPT,
                        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                    )
                    .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
                    .header(reqwest::header::REFERER, referer)
                    .send()
                    .await?;
                let status = response.status();

                if status == StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(ScraperError::RateLimited {
                        domain: url.host_str().unwrap_or_default().to_string(),
                        retry_after_secs,
                    });
                }

                if !status.is_success() {
                    return Err(ScraperError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                Ok(response.text().await?)
            }
        })
        .await
    }
}

fn origin_of(url: &Url) -> String {
    format!("{}/", url.origin().ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_keeps_scheme_host_and_port() {
        let url = Url::parse("http://127.0.0.1:8080/s?k=laptop").unwrap();
        assert_eq!(origin_of(&url), "http://127.0.0.1:8080/");
    }

    #[test]
    fn builds_with_custom_user_agent() {
        assert!(HttpFetcher::new(5, "pricecomp-test/0.1", 0, 0).is_ok());
    }
}
