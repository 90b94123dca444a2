//! Search request model and its validation.
//!
//! [`SearchRequest`] is the raw shape a caller hands in; [`SearchRequest::validate`]
//! applies defaults and clamps, rejects malformed filters and sort specs, and
//! yields an immutable [`ValidatedRequest`] before any cache or network work.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::region::Region;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;
pub const MAX_RATING: f64 = 5.0;

/// Optional predicates applied to the aggregated listing set.
///
/// Zero-valued bounds are treated as unset, so `max_price = 0` never filters
/// everything out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,
    /// Case-insensitive, matched in both directions against the listing source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Filter {
    /// `true` when no predicate is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min_price.is_none()
            && self.max_price.is_none()
            && self.in_stock.is_none()
            && self.min_rating.is_none()
            && self.source.is_none()
    }

    fn validated(self) -> Result<Self, ValidationError> {
        let min_price = positive_or_unset(self.min_price, "min_price")?;
        let max_price = positive_or_unset(self.max_price, "max_price")?;
        let min_rating = positive_or_unset(self.min_rating, "min_rating")?;

        if self.min_price.is_some_and(|v| v < 0.0) {
            return Err(ValidationError::NegativeMinPrice);
        }
        if self.max_price.is_some_and(|v| v < 0.0) {
            return Err(ValidationError::NegativeMaxPrice);
        }
        if let (Some(min), Some(max)) = (min_price, max_price) {
            if max < min {
                return Err(ValidationError::InvertedPriceRange);
            }
        }
        if self
            .min_rating
            .is_some_and(|v| !(0.0..=MAX_RATING).contains(&v))
        {
            return Err(ValidationError::RatingOutOfRange);
        }

        let source = self
            .source
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            min_price,
            max_price,
            in_stock: self.in_stock,
            min_rating,
            source,
        })
    }
}

/// Rejects non-finite input and collapses zero to "unset".
fn positive_or_unset(
    value: Option<f64>,
    field: &'static str,
) -> Result<Option<f64>, ValidationError> {
    match value {
        Some(v) if !v.is_finite() => Err(ValidationError::NonFinite(field)),
        Some(v) if v > 0.0 => Ok(Some(v)),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Price,
    Rating,
    Name,
}

impl SortField {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Rating => "rating",
            Self::Name => "name",
        }
    }
}

impl FromStr for SortField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price" => Ok(Self::Price),
            "rating" => Ok(Self::Rating),
            "name" => Ok(Self::Name),
            other => Err(ValidationError::InvalidSortField(other.to_string())),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(ValidationError::InvalidSortOrder(other.to_string())),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort field and order as supplied by the caller, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortParams {
    pub field: String,
    /// Defaults to ascending when absent.
    #[serde(default)]
    pub order: Option<String>,
}

/// Validated sort field and order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortSpec {
    #[must_use]
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }
}

impl TryFrom<SortParams> for SortSpec {
    type Error = ValidationError;

    fn try_from(params: SortParams) -> Result<Self, Self::Error> {
        let field = params.field.trim().to_ascii_lowercase().parse()?;
        let order = match params.order.as_deref().map(str::trim) {
            None | Some("") => SortOrder::Asc,
            Some(raw) => raw.to_ascii_lowercase().parse()?,
        };
        Ok(Self { field, order })
    }
}

/// A search as received from a caller, before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub filter: Option<Filter>,
    #[serde(default)]
    pub sort: Option<SortParams>,
}

impl SearchRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    #[must_use]
    pub fn page(mut self, page: i64) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn sort(mut self, field: impl Into<String>, order: impl Into<String>) -> Self {
        self.sort = Some(SortParams {
            field: field.into(),
            order: Some(order.into()),
        });
        self
    }

    /// Applies defaults and rejects malformed input.
    ///
    /// - the query is trimmed and must be non-empty
    /// - a blank region falls back to `default_region`
    /// - `page < 1` becomes 1; `limit < 1` becomes [`DEFAULT_LIMIT`], and
    ///   anything above [`MAX_LIMIT`] is clamped
    /// - price bounds must be non-negative with `max >= min`, and
    ///   `min_rating` must lie in `0..=5`
    /// - sort field and order must be known values
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(self, default_region: &Region) -> Result<ValidatedRequest, ValidationError> {
        let query = self.query.trim().to_string();
        if query.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }

        let region = self
            .region
            .as_deref()
            .and_then(Region::parse)
            .unwrap_or_else(|| default_region.clone());

        let page = match self.page {
            Some(p) if p >= 1 => u32::try_from(p).unwrap_or(u32::MAX),
            _ => DEFAULT_PAGE,
        };
        let limit = match self.limit {
            Some(l) if l >= 1 => u32::try_from(l.min(i64::from(MAX_LIMIT))).unwrap_or(MAX_LIMIT),
            _ => DEFAULT_LIMIT,
        };

        let filter = self
            .filter
            .map(Filter::validated)
            .transpose()?
            .filter(|f| !f.is_empty());

        let sort = self.sort.map(SortSpec::try_from).transpose()?;

        Ok(ValidatedRequest {
            query,
            region,
            page,
            limit,
            filter,
            sort,
        })
    }
}

/// A request that passed validation. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    query: String,
    region: Region,
    page: u32,
    limit: u32,
    filter: Option<Filter>,
    sort: Option<SortSpec>,
}

impl ValidatedRequest {
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn region(&self) -> &Region {
        &self.region
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    #[must_use]
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    #[must_use]
    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }
}
