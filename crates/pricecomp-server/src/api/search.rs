use axum::{
    extract::{Query, State},
    Extension, Json,
};
use pricecomp_core::{Filter, SearchRequest, SearchResponse, SortParams};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

/// Raw query string. Every value is kept as text so that an unparseable
/// number is ignored rather than rejected.
#[derive(Debug, Default, Deserialize)]
pub(super) struct SearchQuery {
    pub q: Option<String>,
    pub country: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub source: Option<String>,
    pub in_stock: Option<String>,
    pub min_rating: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}

impl SearchQuery {
    fn filter(&self) -> Option<Filter> {
        let min_price = present(self.min_price.as_ref());
        let max_price = present(self.max_price.as_ref());
        let source = present(self.source.as_ref());
        let in_stock = present(self.in_stock.as_ref());
        let min_rating = present(self.min_rating.as_ref());

        if [min_price, max_price, source, in_stock, min_rating]
            .iter()
            .all(Option::is_none)
        {
            return None;
        }

        Some(Filter {
            min_price: min_price.and_then(|v| v.parse().ok()),
            max_price: max_price.and_then(|v| v.parse().ok()),
            in_stock: in_stock.and_then(parse_flag),
            min_rating: min_rating.and_then(|v| v.parse().ok()),
            source: source.map(ToOwned::to_owned),
        })
    }

    pub(super) fn into_request(self) -> SearchRequest {
        let filter = self.filter();
        let sort = present(self.sort.as_ref()).map(|field| SortParams {
            field: field.to_string(),
            order: present(self.order.as_ref()).map(ToOwned::to_owned),
        });

        SearchRequest {
            query: self.q.unwrap_or_default(),
            region: present(self.country.as_ref()).map(ToOwned::to_owned),
            page: present(self.page.as_ref()).and_then(|v| v.parse().ok()),
            limit: present(self.limit.as_ref()).and_then(|v| v.parse().ok()),
            filter,
            sort,
        }
    }
}

pub(super) async fn search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<SearchResponse>>, ApiError> {
    let response = state
        .service
        .search_products(query.into_request())
        .await
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    Ok(ApiResponse::new(response, req_id.0))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::super::test_support::{send, test_app};
    use super::*;

    #[test]
    fn unparseable_numbers_are_ignored() {
        let request = SearchQuery {
            q: Some("tv".into()),
            page: Some("two".into()),
            limit: Some("5".into()),
            min_price: Some("cheap".into()),
            max_price: Some("500".into()),
            ..SearchQuery::default()
        }
        .into_request();

        assert_eq!(request.page, None);
        assert_eq!(request.limit, Some(5));
        let filter = request.filter.expect("filter present");
        assert_eq!(filter.min_price, None);
        assert_eq!(filter.max_price, Some(500.0));
    }

    #[test]
    fn blank_params_are_absent() {
        let request = SearchQuery {
            q: Some("tv".into()),
            country: Some("  ".into()),
            source: Some(String::new()),
            sort: Some(String::new()),
            order: Some("desc".into()),
            ..SearchQuery::default()
        }
        .into_request();

        assert_eq!(request.region, None);
        assert!(request.filter.is_none());
        assert!(request.sort.is_none());
    }

    #[test]
    fn in_stock_flag_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("f"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[tokio::test]
    async fn search_returns_enveloped_response() {
        let (app, _) = test_app(true, 20).await;
        let (status, body) = send(&app, "GET", "/search?q=laptop&country=in&sort=price&order=asc").await;
        assert_eq!(status, StatusCode::OK);

        let data = &body["data"];
        assert_eq!(data["query"], "laptop");
        assert_eq!(data["total"], 3);
        assert_eq!(data["source"], "Alpha, Beta");
        assert_eq!(data["products"][0]["name"], "Laptop Sleeve");
        assert_eq!(data["cached"], false);

        let (_, again) = send(&app, "GET", "/search?q=laptop&country=in&sort=price&order=asc").await;
        assert_eq!(again["data"]["cached"], true);
    }

    #[tokio::test]
    async fn regional_source_is_skipped_elsewhere() {
        let (app, _) = test_app(false, 20).await;
        let (_, body) = send(&app, "GET", "/search?q=laptop&country=US").await;
        assert_eq!(body["data"]["total"], 2);
        assert_eq!(body["data"]["source"], "Alpha");
    }

    #[tokio::test]
    async fn empty_query_is_a_validation_error() {
        let (app, _) = test_app(false, 20).await;
        let (status, body) = send(&app, "GET", "/search?country=IN").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn inverted_price_range_is_a_validation_error() {
        let (app, _) = test_app(false, 20).await;
        let (status, _) = send(&app, "GET", "/search?q=laptop&min_price=500&max_price=100").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_sort_field_is_a_validation_error() {
        let (app, _) = test_app(false, 20).await;
        let (status, body) = send(&app, "GET", "/search?q=laptop&sort=popularity").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("popularity"));
    }
}
