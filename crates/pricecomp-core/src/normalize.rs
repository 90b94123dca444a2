//! Total, lossy conversion of free-text prices and ratings into numbers.
//!
//! Sources render prices with currency symbols, thousands separators and
//! surrounding prose. Downstream filtering and sorting must never fail on
//! malformed source data, so every function here returns `0.0` instead of an
//! error when no number can be found.

use std::sync::LazyLock;

use regex::Regex;

use crate::listing::Listing;

/// First run of digits with at most one decimal point.
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?|\.\d+").expect("valid regex"));

/// Currency symbols and codes, including an abbreviation dot such as `Rs.`.
static CURRENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[$₹£€¥]|\b(?:rs|inr|usd|eur|gbp)\.?").expect("valid regex")
});

/// Parses a price string such as `"$1,234.56"` into `1234.56`.
///
/// Currency marks and thousands separators are removed before the first
/// numeric token is extracted, so Indian grouping (`"₹1,23,456"`) and
/// `"Rs.1,499"` also work. Returns `0.0`
/// for empty or non-numeric input.
#[must_use]
pub fn parse_price(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    let cleaned = CURRENCY_RE.replace_all(text, " ").replace(',', "");
    first_number(cleaned.trim())
}

/// Parses a rating string such as `"4.5 out of 5 stars"` into `4.5`.
///
/// Returns `0.0` for empty or non-numeric input.
#[must_use]
pub fn parse_rating(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    first_number(text)
}

/// Attaches [`Listing::price_value`] to every listing in place.
pub fn normalize_listings(listings: &mut [Listing]) {
    for listing in listings {
        listing.normalize();
    }
}

fn first_number(text: &str) -> f64 {
    NUMBER_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}
