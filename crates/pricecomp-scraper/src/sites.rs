//! Built-in site profiles.
//!
//! Amazon and eBay are consulted for every region and return nothing where
//! they have no storefront. Flipkart only serves India; Walmart, Target and
//! Best Buy only serve the US.

use crate::profile::{Selectors, SiteProfile, Storefront};

const fn store(
    region: &'static str,
    base_url: &'static str,
    currency: &'static str,
    symbol: &'static str,
) -> Storefront {
    Storefront {
        region,
        base_url,
        currency,
        symbol,
    }
}

pub static AMAZON: SiteProfile = SiteProfile {
    name: "Amazon",
    slug: "amazon",
    global: true,
    storefronts: &[
        store("US", "https://www.amazon.com", "USD", "$"),
        store("IN", "https://www.amazon.in", "INR", "₹"),
        store("UK", "https://www.amazon.co.uk", "GBP", "£"),
        store("GB", "https://www.amazon.co.uk", "GBP", "£"),
        store("DE", "https://www.amazon.de", "EUR", "€"),
        store("CA", "https://www.amazon.ca", "CAD", "$"),
        store("AU", "https://www.amazon.com.au", "AUD", "$"),
        store("FR", "https://www.amazon.fr", "EUR", "€"),
        store("IT", "https://www.amazon.it", "EUR", "€"),
        store("ES", "https://www.amazon.es", "EUR", "€"),
        store("JP", "https://www.amazon.co.jp", "JPY", "¥"),
    ],
    search_path: "/s",
    query_param: "k",
    extra_params: &[],
    selectors: Selectors {
        item: "div[data-component-type='s-search-result']",
        title: "h2 a span, h2 span",
        price: ".a-price .a-offscreen, .a-price-whole",
        link: "h2 a, a.a-link-normal",
        image: "img.s-image",
        rating: ".a-icon-alt",
        reviews: ".a-size-base.s-underline-text",
    },
    ignored_titles: &[],
    title_prefixes: &[],
};

pub static EBAY: SiteProfile = SiteProfile {
    name: "eBay",
    slug: "ebay",
    global: true,
    storefronts: &[
        store("US", "https://www.ebay.com", "USD", "$"),
        store("UK", "https://www.ebay.co.uk", "GBP", "£"),
        store("GB", "https://www.ebay.co.uk", "GBP", "£"),
        store("DE", "https://www.ebay.de", "EUR", "€"),
        store("CA", "https://www.ebay.ca", "CAD", "C$"),
        store("AU", "https://www.ebay.com.au", "AUD", "A$"),
        store("FR", "https://www.ebay.fr", "EUR", "€"),
        store("IT", "https://www.ebay.it", "EUR", "€"),
        store("IN", "https://www.ebay.com", "INR", "₹"),
    ],
    search_path: "/sch/i.html",
    query_param: "_nkw",
    extra_params: &[("_sacat", "0")],
    selectors: Selectors {
        item: "li.s-item, div.s-item",
        title: ".s-item__title",
        price: ".s-item__price",
        link: "a.s-item__link, .s-item__title a",
        image: ".s-item__image img, img",
        rating: ".x-star-rating .clipped, .ebay-review-stars",
        reviews: ".s-item__reviews-count span, .s-item__reviews-count",
    },
    ignored_titles: &["Shop on eBay"],
    title_prefixes: &["New Listing", "Sponsored"],
};

pub static FLIPKART: SiteProfile = SiteProfile {
    name: "Flipkart",
    slug: "flipkart",
    global: false,
    storefronts: &[store("IN", "https://www.flipkart.com", "INR", "₹")],
    search_path: "/search",
    query_param: "q",
    extra_params: &[],
    selectors: Selectors {
        item: "div[data-id]",
        title: "._4rR01T, .s1Q9rs, ._2WkVRV, .KzDlHZ, .wjcEIp",
        price: "._30jeq3, .Nx9bqj",
        link: "a[href]",
        image: "img._396cs4, img._2r_T1I, img.DByuf4, img",
        rating: "._3LWZlK, .XQDdHH",
        reviews: "._2_R_DZ, .Wphh3N",
    },
    ignored_titles: &[],
    title_prefixes: &[],
};

pub static WALMART: SiteProfile = SiteProfile {
    name: "Walmart",
    slug: "walmart",
    global: false,
    storefronts: &[store("US", "https://www.walmart.com", "USD", "$")],
    search_path: "/search",
    query_param: "q",
    extra_params: &[],
    selectors: Selectors {
        item: "[data-testid='item'], [data-item-id]",
        title: "[data-automation-id='product-title'], span.w_iUH7",
        price: "[data-automation-id='product-price'] .w_iUH7, [data-automation-id='product-price'], .price-current",
        link: "a[link-identifier], a[href*='/ip/']",
        image: "img[data-testid='productTileImage'], img",
        rating: "[data-testid='product-ratings'], .w_iUH7[aria-hidden='true']",
        reviews: "[data-testid='product-reviews']",
    },
    ignored_titles: &[],
    title_prefixes: &[],
};

pub static TARGET: SiteProfile = SiteProfile {
    name: "Target",
    slug: "target",
    global: false,
    storefronts: &[store("US", "https://www.target.com", "USD", "$")],
    search_path: "/s",
    query_param: "searchTerm",
    extra_params: &[],
    selectors: Selectors {
        item: "[data-test='@web/site-top-of-funnel/ProductCardWrapper'], [data-test='product-card']",
        title: "[data-test='product-title']",
        price: "[data-test='current-price'], [data-test='product-price']",
        link: "a[data-test='product-title'], a[href*='/p/']",
        image: "img",
        rating: "[data-test='ratings'] span",
        reviews: "[data-test='rating-count']",
    },
    ignored_titles: &[],
    title_prefixes: &[],
};

pub static BEST_BUY: SiteProfile = SiteProfile {
    name: "Best Buy",
    slug: "bestbuy",
    global: false,
    storefronts: &[store("US", "https://www.bestbuy.com", "USD", "$")],
    search_path: "/site/searchpage.jsp",
    query_param: "st",
    extra_params: &[],
    selectors: Selectors {
        item: ".sku-item, li.product-list-item",
        title: ".sku-title a, .sku-header a, .product-title",
        price: ".priceView-customer-price span, .sku-price, .current-price",
        link: ".sku-title a, .sku-header a, a.product-list-item-link",
        image: "img.product-image, img",
        rating: ".c-ratings-reviews .visually-hidden, .sr-rating",
        reviews: ".c-reviews-v4 .c-total-reviews, .c-total-reviews",
    },
    ignored_titles: &[],
    title_prefixes: &[],
};

/// Every built-in site, in source-label order.
pub static ALL: [&SiteProfile; 6] = [&AMAZON, &EBAY, &FLIPKART, &WALMART, &TARGET, &BEST_BUY];
