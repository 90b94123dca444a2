//! `search` command: runs one search in-process and prints the page.

use clap::Args;
use pricecomp_core::{Filter, Listing, SearchRequest, SearchResponse, SortParams};
use pricecomp_search::SearchService;

const NAME_WIDTH: usize = 48;

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Search terms
    pub query: String,
    /// Region code (defaults to PRICECOMP_DEFAULT_REGION)
    #[arg(long)]
    pub region: Option<String>,
    #[arg(long)]
    pub page: Option<i64>,
    #[arg(long)]
    pub limit: Option<i64>,
    #[arg(long)]
    pub min_price: Option<f64>,
    #[arg(long)]
    pub max_price: Option<f64>,
    /// Keep listings whose source matches this name (case-insensitive)
    #[arg(long)]
    pub source: Option<String>,
    /// Keep only listings marked in stock
    #[arg(long)]
    pub in_stock: bool,
    #[arg(long)]
    pub min_rating: Option<f64>,
    /// price, rating or name
    #[arg(long)]
    pub sort: Option<String>,
    /// asc or desc
    #[arg(long, requires = "sort")]
    pub order: Option<String>,
    /// Print the raw response as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    pub(crate) fn to_request(&self) -> SearchRequest {
        let filter = Filter {
            min_price: self.min_price,
            max_price: self.max_price,
            in_stock: self.in_stock.then_some(true),
            min_rating: self.min_rating,
            source: self.source.clone(),
        };

        SearchRequest {
            query: self.query.clone(),
            region: self.region.clone(),
            page: self.page,
            limit: self.limit,
            filter: (!filter.is_empty()).then_some(filter),
            sort: self.sort.clone().map(|field| SortParams {
                field,
                order: self.order.clone(),
            }),
        }
    }
}

/// Runs the search and prints either a table or JSON.
///
/// # Errors
///
/// Returns an error if the request fails validation or JSON encoding fails.
pub(crate) async fn run_search(service: &SearchService, args: SearchArgs) -> anyhow::Result<()> {
    let response = service
        .search_products(args.to_request())
        .await
        .map_err(|e| anyhow::anyhow!("invalid search: {e}"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_table(&response);
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        format!("{}...", text.chars().take(width - 3).collect::<String>())
    } else {
        text.to_string()
    }
}

pub(crate) fn format_row(listing: &Listing) -> String {
    let rating = listing
        .rating
        .as_ref()
        .map_or_else(|| "-".to_string(), |_| format!("{:.1}", listing.rating_value()));
    let stock = if listing.in_stock { "yes" } else { "no" };
    format!(
        "{:<50}{:<16}{:<8}{:<7}{}",
        truncate(&listing.name, NAME_WIDTH),
        listing.price,
        rating,
        stock,
        listing.source
    )
}

fn print_table(response: &SearchResponse) {
    if response.products.is_empty() {
        println!(
            "no listings found for \"{}\" (sources: {})",
            response.query, response.source
        );
        return;
    }

    println!("{:<50}{:<16}{:<8}{:<7}SOURCE", "NAME", "PRICE", "RATING", "STOCK");
    for listing in &response.products {
        println!("{}", format_row(listing));
    }
    println!();
    println!(
        "page {}/{} - {} listings from {} in {} ms",
        response.page, response.total_pages, response.total, response.source, response.duration_ms
    );
}
