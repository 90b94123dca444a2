use pricecomp_core::{Coverage, Region};
use reqwest::Url;

use crate::error::ScraperError;

/// Regional storefront of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Storefront {
    /// Upper-case region code, e.g. `"UK"`.
    pub region: &'static str,
    /// Scheme and host, no trailing slash.
    pub base_url: &'static str,
    pub currency: &'static str,
    /// Prefixed onto price text that carries no symbol of its own.
    pub symbol: &'static str,
}

/// CSS selector groups. Each field may list alternatives separated by commas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selectors {
    /// One match per result card.
    pub item: &'static str,
    pub title: &'static str,
    pub price: &'static str,
    /// Element carrying the product `href`.
    pub link: &'static str,
    pub image: &'static str,
    pub rating: &'static str,
    pub reviews: &'static str,
}

/// Everything needed to search one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteProfile {
    /// Display name, e.g. `"Best Buy"`.
    pub name: &'static str,
    /// Lower-case id prefix, e.g. `"bestbuy"`.
    pub slug: &'static str,
    /// Consulted for every region when `true`, otherwise only where a
    /// storefront exists.
    pub global: bool,
    pub storefronts: &'static [Storefront],
    pub search_path: &'static str,
    pub query_param: &'static str,
    pub extra_params: &'static [(&'static str, &'static str)],
    pub selectors: Selectors,
    /// Placeholder card titles to skip, compared case-insensitively.
    pub ignored_titles: &'static [&'static str],
    /// Prefixes stripped from titles, compared case-insensitively.
    pub title_prefixes: &'static [&'static str],
}

impl SiteProfile {
    #[must_use]
    pub fn storefront(&self, region: &Region) -> Option<&'static Storefront> {
        self.storefronts
            .iter()
            .find(|s| s.region == region.as_str())
    }

    #[must_use]
    pub fn coverage(&self) -> Coverage {
        if self.global {
            Coverage::Global
        } else {
            Coverage::regions(self.storefronts.iter().map(|s| s.region))
        }
    }

    /// Search URL for `query` against `base_url`, e.g.
    /// `https://www.amazon.in/s?k=usb+hub`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if `base_url` joined with the
    /// search path is not a valid URL.
    pub fn search_url(&self, base_url: &str, query: &str) -> Result<Url, ScraperError> {
        let raw = format!("{}{}", base_url.trim_end_matches('/'), self.search_path);
        let mut url = Url::parse(&raw).map_err(|e| ScraperError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair(self.query_param, query);
            for (key, value) in self.extra_params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}
