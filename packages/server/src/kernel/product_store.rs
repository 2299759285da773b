//! Postgres-backed product store.
//!
//! The `products` table is created on first use rather than by a migration
//! step, so the service can point at an empty database and just work.

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use tracing::info;

use super::BaseProductStore;
use crate::domains::products::errors::ProductStoreError;
use crate::domains::products::models::Product;

pub struct PostgresProductStore {
    pool: PgPool,
    schema_ready: OnceCell<()>,
}

impl PostgresProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: OnceCell::new(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run schema creation exactly once per process.
    ///
    /// Concurrent first callers wait on the same initialisation. A failed
    /// attempt leaves the cell empty so the next call retries.
    async fn ready(&self) -> Result<&PgPool, ProductStoreError> {
        self.schema_ready
            .get_or_try_init(|| async {
                Product::ensure_schema(&self.pool).await?;
                info!("Product schema ready");
                Ok::<(), ProductStoreError>(())
            })
            .await?;

        Ok(&self.pool)
    }
}

#[async_trait]
impl BaseProductStore for PostgresProductStore {
    async fn upsert_many(&self, products: &[Product]) -> Result<u64, ProductStoreError> {
        let pool = self.ready().await?;
        Product::upsert_many(products, pool).await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Product>, ProductStoreError> {
        let pool = self.ready().await?;
        Product::find_by_id(id, pool).await
    }

    async fn get_many_by_ids(&self, ids: &[String]) -> Result<Vec<Product>, ProductStoreError> {
        let pool = self.ready().await?;
        Product::find_by_ids(ids, pool).await
    }

    async fn search_by_name(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, ProductStoreError> {
        let pool = self.ready().await?;
        Product::search_by_name(query, limit, offset, pool).await
    }

    async fn ping(&self) -> Result<(), ProductStoreError> {
        Product::ping(&self.pool).await
    }
}
