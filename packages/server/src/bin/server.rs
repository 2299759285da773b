//! Product search API server
//!
//! Builds every adapter once, serves HTTP until a shutdown signal arrives,
//! then tears the adapters down.

use anyhow::{Context, Result};
use reindeer_core::kernel::ServerRuntime;
use reindeer_core::server::build_app;
use reindeer_core::{log_filter_for, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env so LOG_LEVEL is visible before logging starts
    let _ = dotenvy::dotenv();

    // Initialize logging
    let log_level = std::env::var("LOG_LEVEL").ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter_for(log_level.as_deref()).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            return Err(e.context("Failed to load configuration"));
        }
    };

    tracing::info!(
        environment = config.environment.as_deref().unwrap_or("unset"),
        "Starting Reindeer Product Search API"
    );

    // Log masked env vars for deployment troubleshooting
    fn mask_env(name: &str) {
        match std::env::var(name) {
            Ok(val) if val.is_empty() => tracing::info!("  {}: (empty)", name),
            Ok(val) => {
                let show = val.char_indices().nth(4).map(|(i, _)| i).unwrap_or(val.len());
                tracing::info!(
                    "  {}: {}{}  ({} chars)",
                    name,
                    &val[..show],
                    "*".repeat(val.chars().count().saturating_sub(4)),
                    val.chars().count()
                );
            }
            Err(_) => tracing::warn!("  {}: NOT SET", name),
        }
    }
    tracing::info!("Environment variables:");
    for name in &[
        "DATABASE_URL", "DB_HOST", "DB_NAME", "NAVER_CLIENT_ID", "NAVER_CLIENT_SECRET",
        "AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY", "AWS_REGION", "S3_BUCKET_NAME",
    ] {
        mask_env(name);
    }

    let runtime = ServerRuntime::start(&config).await?;
    let app = build_app(runtime.deps.clone());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down");
    runtime.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
