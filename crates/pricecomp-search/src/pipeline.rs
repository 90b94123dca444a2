//! Filter, sort and paginate stages applied to aggregated listings, always in
//! that order.

use pricecomp_core::{total_pages, Filter, Listing, SortField, SortOrder, SortSpec};

/// Keeps listings satisfying every predicate set on `filter`. `None` passes
/// everything through.
#[must_use]
pub fn filter_listings(listings: Vec<Listing>, filter: Option<&Filter>) -> Vec<Listing> {
    let Some(filter) = filter else {
        return listings;
    };
    listings
        .into_iter()
        .filter(|listing| matches_filter(listing, filter))
        .collect()
}

fn matches_filter(listing: &Listing, filter: &Filter) -> bool {
    let price = listing.price_value();
    if filter.min_price.is_some_and(|min| price < min) {
        return false;
    }
    if filter.max_price.is_some_and(|max| price > max) {
        return false;
    }
    if filter.in_stock.is_some_and(|wanted| listing.in_stock != wanted) {
        return false;
    }
    if filter
        .min_rating
        .is_some_and(|min| listing.rating_value() < min)
    {
        return false;
    }
    if let Some(source) = &filter.source {
        let wanted = source.to_lowercase();
        let actual = listing.source.to_lowercase();
        // "ebay" matches "eBay US" and "Amazon IN extended" matches "Amazon IN"
        if !actual.contains(&wanted) && !wanted.contains(&actual) {
            return false;
        }
    }
    true
}

/// Stable sort by the requested field. `None` keeps aggregation order.
pub fn sort_listings(listings: &mut [Listing], sort: Option<SortSpec>) {
    let Some(spec) = sort else {
        return;
    };
    listings.sort_by(|a, b| {
        let ordering = match spec.field {
            SortField::Price => a.price_value().total_cmp(&b.price_value()),
            SortField::Rating => a.rating_value().total_cmp(&b.rating_value()),
            SortField::Name => a.name.as_bytes().cmp(b.name.as_bytes()),
        };
        match spec.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

/// One page of listings plus the totals computed before slicing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Listing>,
    pub total: usize,
    pub total_pages: u32,
}

/// Slices `listings[(page-1)*limit ..]`. A page past the end is empty but
/// still reports the correct totals.
#[must_use]
pub fn paginate(listings: Vec<Listing>, page: u32, limit: u32) -> Page {
    let total = listings.len();
    let total_pages = total_pages(total, limit);
    let limit = limit as usize;
    let start = (page.max(1) as usize - 1).saturating_mul(limit);

    let items = if start >= total {
        Vec::new()
    } else {
        let end = start.saturating_add(limit).min(total);
        let mut listings = listings;
        listings.truncate(end);
        listings.split_off(start)
    };

    Page {
        items,
        total,
        total_pages,
    }
}
