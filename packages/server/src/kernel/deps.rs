//! Server dependencies (using traits for testability)
//!
//! `ServerDeps` is the composition root: every adapter is built once at
//! startup and handed to activities and routes by reference.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;
use crate::kernel::{
    BaseBackgroundRemover, BaseImageStore, BaseObjectStorage, BaseProductFetcher,
    BaseProductStore, EdgeFloodRemover, NaverFetcher, ObjectImageStore, PostgresProductStore,
    S3ObjectStorage,
};

#[derive(Clone)]
pub struct ServerDeps {
    pub fetcher: Arc<dyn BaseProductFetcher>,
    pub product_store: Arc<dyn BaseProductStore>,
    pub image_store: Arc<dyn BaseImageStore>,
}

impl ServerDeps {
    pub fn new(
        fetcher: Arc<dyn BaseProductFetcher>,
        product_store: Arc<dyn BaseProductStore>,
        image_store: Arc<dyn BaseImageStore>,
    ) -> Self {
        Self {
            fetcher,
            product_store,
            image_store,
        }
    }
}

/// Everything built at startup, plus the handles needed to tear it down.
pub struct ServerRuntime {
    pub deps: Arc<ServerDeps>,
    pub db_pool: PgPool,
}

impl ServerRuntime {
    /// Build all adapters from configuration.
    pub async fn start(config: &Config) -> Result<Self> {
        info!(
            host = %config.database.host,
            database = %config.database.name,
            "Connecting to database..."
        );
        let db_pool = PgPoolOptions::new()
            .min_connections(config.database.min_connections)
            .max_connections(config.database.max_connections)
            .connect(&config.database.url())
            .await
            .context("Failed to connect to database")?;
        info!("Database connected");

        let fetcher = NaverFetcher::new(
            config.naver.client_id.clone(),
            config.naver.client_secret.clone(),
            config.naver.base_url.clone(),
            config.naver.timeout,
        )?;

        let storage: Arc<dyn BaseObjectStorage> =
            Arc::new(S3ObjectStorage::from_settings(&config.s3).await);
        let remover: Arc<dyn BaseBackgroundRemover> = Arc::new(EdgeFloodRemover::default());
        let image_store = ObjectImageStore::new(storage, remover, config.s3.timeout)?;
        info!(bucket = %config.s3.bucket, region = %config.s3.region, "Object storage ready");

        let deps = ServerDeps::new(
            Arc::new(fetcher),
            Arc::new(PostgresProductStore::new(db_pool.clone())),
            Arc::new(image_store),
        );

        Ok(Self {
            deps: Arc::new(deps),
            db_pool,
        })
    }

    /// Release resources in reverse order of construction.
    pub async fn shutdown(self) {
        drop(self.deps);
        self.db_pool.close().await;
        info!("Database pool closed");
    }
}
