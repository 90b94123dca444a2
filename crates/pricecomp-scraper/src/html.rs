//! Extraction of listings from a storefront search page.

use chrono::{DateTime, Utc};
use pricecomp_core::{Listing, Region};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::error::ScraperError;
use crate::profile::{SiteProfile, Storefront};

const OUT_OF_STOCK_MARKERS: [&str; 3] = ["out of stock", "currently unavailable", "sold out"];
const CURRENCY_MARKS: [&str; 8] = ["$", "₹", "£", "€", "¥", "rs", "inr", "usd"];

struct Compiled {
    item: Selector,
    title: Selector,
    price: Selector,
    link: Selector,
    image: Selector,
    rating: Selector,
    reviews: Selector,
}

fn compile(selector: &str) -> Result<Selector, ScraperError> {
    Selector::parse(selector).map_err(|e| ScraperError::Selector {
        selector: selector.to_string(),
        reason: format!("{e:?}"),
    })
}

impl Compiled {
    fn new(profile: &SiteProfile) -> Result<Self, ScraperError> {
        let s = &profile.selectors;
        Ok(Self {
            item: compile(s.item)?,
            title: compile(s.title)?,
            price: compile(s.price)?,
            link: compile(s.link)?,
            image: compile(s.image)?,
            rating: compile(s.rating)?,
            reviews: compile(s.reviews)?,
        })
    }
}

/// Where a page came from, used to label and resolve what is parsed out of it.
pub struct PageContext<'a> {
    pub profile: &'a SiteProfile,
    pub storefront: &'a Storefront,
    pub region: &'a Region,
    /// Base for resolving relative product and image links.
    pub base_url: &'a Url,
    pub scraped_at: DateTime<Utc>,
}

/// Parses every result card on `html` into a [`Listing`].
///
/// Cards with no title or no price are skipped. Ids are
/// `<slug>_<REGION>_<n>` numbered from 1 in page order.
///
/// # Errors
///
/// Returns [`ScraperError::Selector`] if a profile selector does not parse.
pub fn parse_listings(html: &str, ctx: &PageContext<'_>) -> Result<Vec<Listing>, ScraperError> {
    let selectors = Compiled::new(ctx.profile)?;
    let document = Html::parse_document(html);

    let mut listings = Vec::new();
    for card in document.select(&selectors.item) {
        let Some(name) = first_text(card, &selectors.title).and_then(|t| clean_title(ctx.profile, &t))
        else {
            continue;
        };
        let Some(price) = first_text(card, &selectors.price) else {
            continue;
        };

        let url = first_attr(card, &selectors.link, &["href"])
            .and_then(|href| resolve(ctx.base_url, &href))
            .unwrap_or_default();
        let image = first_attr(card, &selectors.image, &["src", "data-src"])
            .and_then(|src| resolve(ctx.base_url, &src))
            .unwrap_or_default();

        let n = listings.len() + 1;
        listings.push(Listing {
            id: format!("{}_{}_{n}", ctx.profile.slug, ctx.region),
            name,
            price: with_currency_symbol(&price, ctx.storefront.symbol),
            currency: ctx.storefront.currency.to_string(),
            price_value: None,
            rating: first_text(card, &selectors.rating),
            reviews: first_text(card, &selectors.reviews),
            source: format!("{} {}", ctx.profile.name, ctx.region),
            url,
            image,
            in_stock: !is_out_of_stock(card),
            scraped_at: ctx.scraped_at,
            description: None,
        });
    }

    Ok(listings)
}

fn first_text(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

fn first_attr(card: ElementRef<'_>, selector: &Selector, attrs: &[&str]) -> Option<String> {
    card.select(selector).find_map(|el| {
        attrs
            .iter()
            .filter_map(|attr| el.value().attr(attr))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string)
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_title(profile: &SiteProfile, raw: &str) -> Option<String> {
    if profile
        .ignored_titles
        .iter()
        .any(|ignored| raw.eq_ignore_ascii_case(ignored))
    {
        return None;
    }
    let mut title = raw;
    for prefix in profile.title_prefixes {
        if title.len() >= prefix.len()
            && title.is_char_boundary(prefix.len())
            && title[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            title = title[prefix.len()..].trim_start();
        }
    }
    (!title.is_empty()).then(|| title.to_string())
}

/// Prefixes the storefront symbol when the price text carries no currency mark.
fn with_currency_symbol(price: &str, symbol: &str) -> String {
    let lower = price.to_lowercase();
    if CURRENCY_MARKS.iter().any(|mark| lower.contains(mark)) {
        price.to_string()
    } else {
        format!("{symbol}{price}")
    }
}

fn is_out_of_stock(card: ElementRef<'_>) -> bool {
    let text = card.text().collect::<String>().to_lowercase();
    OUT_OF_STOCK_MARKERS.iter().any(|marker| text.contains(marker))
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(String::from)
}
