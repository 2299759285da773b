use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::domains::products::activities::{search_products, SearchRequest};
use crate::domains::products::ProductSearchResponse;
use crate::kernel::ServerDeps;
use crate::server::errors::ApiError;

pub const MIN_QUERY_CHARS: usize = 1;
pub const MAX_QUERY_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    #[serde(default = "default_true")]
    pub use_cache: bool,
    #[serde(default = "default_true")]
    pub remove_background: bool,
}

fn default_true() -> bool {
    true
}

impl SearchParams {
    fn validate(self) -> Result<SearchRequest, ApiError> {
        let query = self
            .query
            .ok_or_else(|| ApiError::Validation("query is required".to_string()))?;

        let chars = query.chars().count();
        if chars < MIN_QUERY_CHARS {
            return Err(ApiError::Validation(format!(
                "query must be at least {} character",
                MIN_QUERY_CHARS
            )));
        }
        if chars > MAX_QUERY_CHARS {
            return Err(ApiError::Validation(format!(
                "query must be at most {} characters",
                MAX_QUERY_CHARS
            )));
        }

        Ok(SearchRequest {
            query,
            use_cache: self.use_cache,
            remove_background: self.remove_background,
        })
    }
}

/// GET /api/v1/products/search
pub async fn search_products_handler(
    State(deps): State<Arc<ServerDeps>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<ProductSearchResponse>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::Validation(e.body_text()))?;
    let request = params.validate()?;

    info!(
        query = %request.query,
        use_cache = request.use_cache,
        remove_background = request.remove_background,
        "Product search requested"
    );

    let outcome = search_products(&request, &deps).await?;

    Ok(Json(ProductSearchResponse::new(
        outcome.products,
        request.query,
        request.use_cache,
        request.remove_background,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(query: Option<&str>) -> SearchParams {
        SearchParams {
            query: query.map(String::from),
            use_cache: true,
            remove_background: false,
        }
    }

    #[test]
    fn test_missing_query_rejected() {
        assert!(matches!(params(None).validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_empty_query_rejected() {
        assert!(matches!(params(Some("")).validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_query_length_counts_characters() {
        // 100 Hangul syllables are 300 bytes but still a valid query
        let korean = "가".repeat(100);
        assert!(params(Some(&korean)).validate().is_ok());

        let too_long = "a".repeat(101);
        assert!(matches!(
            params(Some(&too_long)).validate(),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_flags_carried_through() {
        let request = params(Some("노트북")).validate().unwrap();
        assert_eq!(request.query, "노트북");
        assert!(request.use_cache);
        assert!(!request.remove_background);
    }
}
