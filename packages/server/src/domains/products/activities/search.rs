//! Product search: cache lookup, upstream fetch, then archival.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::persist::{persist_products, PersistenceReport};
use crate::domains::products::errors::SearchError;
use crate::domains::products::models::Product;
use crate::kernel::{FetchFailure, FetchSort, ServerDeps};

/// How many cached rows a cache hit returns.
pub const CACHE_RESULT_LIMIT: i64 = 50;

/// Page size requested from the shopping API on a cache miss.
pub const UPSTREAM_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub use_cache: bool,
    pub remove_background: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSource {
    Cache,
    Upstream,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub products: Vec<Product>,
    pub source: SearchSource,
    /// Upstream items dropped because they could not be mapped
    pub skipped_items: usize,
    pub upstream_failure: Option<FetchFailure>,
    pub persistence: PersistenceReport,
}

impl SearchOutcome {
    fn from_cache(products: Vec<Product>) -> Self {
        Self {
            products,
            source: SearchSource::Cache,
            skipped_items: 0,
            upstream_failure: None,
            persistence: PersistenceReport::default(),
        }
    }
}

/// Search products by free-text query.
///
/// With `use_cache`, any cached row whose name contains the query is a hit
/// and the shopping API is not called. Otherwise the first upstream page is
/// fetched, archived (rows and images, concurrently) and returned in full
/// regardless of how many writes succeeded.
///
/// Only product store failures during the cache lookup are errors; upstream
/// failures degrade to an empty result.
pub async fn search_products(
    request: &SearchRequest,
    deps: &ServerDeps,
) -> Result<SearchOutcome, SearchError> {
    let query = request.query.as_str();

    if request.use_cache {
        let cached = deps
            .product_store
            .search_by_name(query, CACHE_RESULT_LIMIT, 0)
            .await?;

        if !cached.is_empty() {
            info!(query = %query, count = cached.len(), "Serving search from cache");
            return Ok(SearchOutcome::from_cache(cached));
        }
        debug!(query = %query, "Cache miss");
    }

    let fetched = deps
        .fetcher
        .fetch(query, UPSTREAM_PAGE_SIZE, 1, FetchSort::Sim)
        .await;

    let skipped_items = fetched.skipped.len();

    if fetched.products.is_empty() {
        info!(query = %query, "Shopping API returned no products");
        return Ok(SearchOutcome {
            products: Vec::new(),
            source: SearchSource::Upstream,
            skipped_items,
            upstream_failure: fetched.failure,
            persistence: PersistenceReport::default(),
        });
    }

    let persistence = persist_products(&fetched.products, request.remove_background, deps).await;

    if persistence.is_clean() {
        info!(
            query = %query,
            products = persistence.products_saved,
            images = persistence.images_saved,
            "Search results archived"
        );
    } else {
        warn!(
            query = %query,
            products_saved = persistence.products_saved,
            product_failures = persistence.product_failures.len(),
            images_saved = persistence.images_saved,
            image_failures = persistence.image_failures.len(),
            background_failures = persistence.background_failures.len(),
            "Search results partially archived"
        );
    }

    Ok(SearchOutcome {
        products: fetched.products,
        source: SearchSource::Upstream,
        skipped_items,
        upstream_failure: fetched.failure,
        persistence,
    })
}
