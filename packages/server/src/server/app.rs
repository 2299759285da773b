//! Application setup and router configuration.

use std::sync::Arc;

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::routes::{health_handler, root_handler, search_products_handler};

/// Build the Axum application router
pub fn build_app(deps: Arc<ServerDeps>) -> Router {
    // CORS configuration - read-only public API, any origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/v1/products/search", get(search_products_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(deps)
}
