use serde::{Deserialize, Serialize};

use crate::domains::products::models::Product;

/// Body of `GET /api/v1/products/search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSearchResponse {
    pub products: Vec<Product>,
    pub total_count: usize,
    pub query: String,
    pub use_cache: bool,
    pub remove_background: bool,
}

impl ProductSearchResponse {
    pub fn new(products: Vec<Product>, query: String, use_cache: bool, remove_background: bool) -> Self {
        Self {
            total_count: products.len(),
            products,
            query,
            use_cache,
            remove_background,
        }
    }
}
