use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pricecomp_core::{Coverage, Listing, Region, Retriever, RetrieverError};
use reqwest::Url;

use crate::error::ScraperError;
use crate::fetch::HttpFetcher;
use crate::html::{parse_listings, PageContext};
use crate::profile::SiteProfile;

/// [`Retriever`] for one storefront family, e.g. every Amazon domain.
pub struct SiteRetriever {
    profile: &'static SiteProfile,
    fetcher: Arc<HttpFetcher>,
    /// Replaces every storefront's base URL. Used to point at a local server.
    base_url_override: Option<String>,
}

impl SiteRetriever {
    #[must_use]
    pub fn new(profile: &'static SiteProfile, fetcher: Arc<HttpFetcher>) -> Self {
        Self {
            profile,
            fetcher,
            base_url_override: None,
        }
    }

    /// Sends every request to `base_url` instead of the storefront's own host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }

    /// Regions this retriever has a storefront for.
    #[must_use]
    pub fn coverage(&self) -> Coverage {
        self.profile.coverage()
    }

    async fn fetch_listings(
        &self,
        query: &str,
        region: &Region,
    ) -> Result<Vec<Listing>, ScraperError> {
        let Some(storefront) = self.profile.storefront(region) else {
            tracing::debug!(site = self.profile.name, %region, "no storefront for region");
            return Ok(Vec::new());
        };

        let base = self
            .base_url_override
            .as_deref()
            .unwrap_or(storefront.base_url);
        let url = self.profile.search_url(base, query)?;
        tracing::debug!(site = self.profile.name, %region, url = %url, "fetching search page");

        let html = self.fetcher.fetch_html(&url).await?;
        let base_url = Url::parse(base).map_err(|e| ScraperError::InvalidUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })?;
        let ctx = PageContext {
            profile: self.profile,
            storefront,
            region,
            base_url: &base_url,
            scraped_at: Utc::now(),
        };
        let listings = parse_listings(&html, &ctx)?;
        tracing::debug!(
            site = self.profile.name,
            %region,
            count = listings.len(),
            "parsed search page"
        );
        Ok(listings)
    }
}

#[async_trait]
impl Retriever for SiteRetriever {
    fn name(&self) -> &str {
        self.profile.name
    }

    async fn search(&self, query: &str, region: &Region) -> Result<Vec<Listing>, RetrieverError> {
        self.fetch_listings(query, region)
            .await
            .map_err(|e| e.into_retriever_error(self.profile.name))
    }
}
