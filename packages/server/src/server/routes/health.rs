use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::kernel::ServerDeps;

const PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    database: DatabaseHealth,
}

#[derive(Serialize)]
pub struct DatabaseHealth {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl DatabaseHealth {
    fn ok() -> Self {
        Self {
            status: "ok",
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            status: "error",
            error: Some(error),
        }
    }
}

/// Health check endpoint
///
/// Pings the product store. Returns 200 OK when it answers within five
/// seconds, 503 Service Unavailable otherwise.
pub async fn health_handler(
    State(deps): State<Arc<ServerDeps>>,
) -> (StatusCode, Json<HealthResponse>) {
    let database = match tokio::time::timeout(PING_TIMEOUT, deps.product_store.ping()).await {
        Ok(Ok(())) => DatabaseHealth::ok(),
        Ok(Err(e)) => DatabaseHealth::failed(format!("ping failed: {}", e)),
        Err(_) => DatabaseHealth::failed(format!("ping timed out after {:?}", PING_TIMEOUT)),
    };

    if database.error.is_some() {
        tracing::warn!(error = ?database.error, "Health check failed");
        let body = HealthResponse {
            status: "unhealthy",
            database,
        };
        return (StatusCode::SERVICE_UNAVAILABLE, Json(body));
    }

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            database,
        }),
    )
}

/// GET /
pub async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Reindeer Product Search API is running"
    }))
}
