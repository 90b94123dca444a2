//! HTTP retrievers for the storefronts pricecomp searches.
//!
//! Each site is a [`SiteProfile`]: storefront URLs per region plus the CSS
//! selectors used to pull listings out of its search page. A
//! [`SiteRetriever`] pairs a profile with a shared [`HttpFetcher`].

pub mod error;
pub mod fetch;
pub mod html;
pub mod profile;
pub(crate) mod retry;
pub mod retriever;
pub mod sites;

use std::sync::Arc;

use pricecomp_core::{Coverage, Retriever};

pub use error::ScraperError;
pub use fetch::HttpFetcher;
pub use profile::{Selectors, SiteProfile, Storefront};
pub use retriever::SiteRetriever;

/// One retriever per built-in site, sharing `fetcher`, with the coverage each
/// one should be registered under.
#[must_use]
pub fn default_retrievers(fetcher: &Arc<HttpFetcher>) -> Vec<(Coverage, Arc<dyn Retriever>)> {
    sites::ALL
        .iter()
        .map(|&profile| {
            let retriever = SiteRetriever::new(profile, Arc::clone(fetcher));
            (retriever.coverage(), Arc::new(retriever) as Arc<dyn Retriever>)
        })
        .collect()
}
