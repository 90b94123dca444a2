use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::{parse_price, parse_rating};

/// One product offer returned by a source for a query.
///
/// Prices and ratings arrive as free text exactly as the source rendered
/// them; the numeric forms used for filtering and sorting are derived through
/// [`crate::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Source-scoped identifier, unique within one response.
    pub id: String,
    pub name: String,
    /// Raw price text, e.g. `"$1,234.56"` or `"₹49,999"`.
    pub price: String,
    /// ISO 4217 currency code of the storefront, e.g. `"USD"`.
    pub currency: String,
    /// Numeric price derived from [`Listing::price`]. `None` until normalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_value: Option<f64>,
    /// Raw rating text, e.g. `"4.5 out of 5 stars"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    /// Raw review-count text as displayed by the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<String>,
    /// Display name of the source, possibly decorated (e.g. `"eBay US"`).
    pub source: String,
    pub url: String,
    pub image: String,
    pub in_stock: bool,
    pub scraped_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Listing {
    /// Attaches the numeric price derived from the raw price text.
    pub fn normalize(&mut self) {
        self.price_value = Some(parse_price(&self.price));
    }

    /// Numeric price, deriving it from the raw text when not yet normalized.
    #[must_use]
    pub fn price_value(&self) -> f64 {
        self.price_value.unwrap_or_else(|| parse_price(&self.price))
    }

    /// Numeric rating derived on demand; `0.0` when absent or unparseable.
    #[must_use]
    pub fn rating_value(&self) -> f64 {
        self.rating.as_deref().map_or(0.0, parse_rating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_listing(price: &str, rating: Option<&str>) -> Listing {
        Listing {
            id: "amazon_US_1".to_string(),
            name: "Wireless Earbuds".to_string(),
            price: price.to_string(),
            currency: "USD".to_string(),
            price_value: None,
            rating: rating.map(str::to_string),
            reviews: None,
            source: "Amazon US".to_string(),
            url: "https://www.amazon.com/dp/B000000001".to_string(),
            image: "https://images.example.com/earbuds.jpg".to_string(),
            in_stock: true,
            scraped_at: Utc::now(),
            description: None,
        }
    }

    #[test]
    fn normalize_attaches_price_value() {
        let mut listing = make_listing("$1,234.56", None);
        assert!(listing.price_value.is_none());
        listing.normalize();
        assert_eq!(listing.price_value, Some(1234.56));
    }

    #[test]
    fn normalize_unparseable_price_yields_zero() {
        let mut listing = make_listing("Currently unavailable", None);
        listing.normalize();
        assert_eq!(listing.price_value, Some(0.0));
    }

    #[test]
    fn price_value_falls_back_to_raw_text() {
        let listing = make_listing("$19.99", None);
        assert!((listing.price_value() - 19.99).abs() < f64::EPSILON);
    }

    #[test]
    fn rating_value_parses_raw_rating() {
        let listing = make_listing("$5", Some("4.5 out of 5 stars"));
        assert!((listing.rating_value() - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn rating_value_missing_is_zero() {
        let listing = make_listing("$5", None);
        assert!(listing.rating_value().abs() < f64::EPSILON);
    }

    #[test]
    fn serde_omits_absent_optional_fields() {
        let listing = make_listing("$5", None);
        let json = serde_json::to_value(&listing).expect("serialize");
        assert!(json.get("rating").is_none());
        assert!(json.get("price_value").is_none());
        assert_eq!(json["source"], "Amazon US");
    }
}
