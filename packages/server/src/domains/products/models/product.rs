use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::domains::products::errors::ProductStoreError;

pub type Result<T> = std::result::Result<T, ProductStoreError>;

/// One shopping item as returned by the search API and cached in `products`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub image_url: String,
    pub url: String,
    pub mall_name: String,
    pub product_type: String,
    pub maker: String,
    pub categories: Vec<String>,
}

/// Database row. Optional columns come back as `None` for rows written by
/// other tools, so they are normalised to empty strings on the way out.
#[derive(FromRow)]
struct ProductRow {
    id: String,
    name: String,
    price: f64,
    image_url: Option<String>,
    url: Option<String>,
    mall_name: Option<String>,
    product_type: Option<String>,
    maker: Option<String>,
    categories: Option<Json<Vec<String>>>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            image_url: row.image_url.unwrap_or_default(),
            url: row.url.unwrap_or_default(),
            mall_name: row.mall_name.unwrap_or_default(),
            product_type: row.product_type.unwrap_or_default(),
            maker: row.maker.unwrap_or_default(),
            categories: row.categories.map(|c| c.0).unwrap_or_default(),
        }
    }
}

const SELECT_COLUMNS: &str = "id, name, price::float8 AS price, image_url, url, mall_name, \
                              product_type, maker, categories";

const UPSERT_COLUMNS: usize = 9;

const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS products (
        id VARCHAR(255) PRIMARY KEY,
        name VARCHAR(1000) NOT NULL,
        price NUMERIC(14, 2) DEFAULT 0.00,
        image_url TEXT,
        url TEXT,
        mall_name VARCHAR(255),
        product_type VARCHAR(255),
        maker VARCHAR(255),
        categories JSONB,
        created_at TIMESTAMPTZ DEFAULT NOW(),
        updated_at TIMESTAMPTZ DEFAULT NOW()
    )",
    "CREATE INDEX IF NOT EXISTS idx_products_name ON products(name)",
    "CREATE INDEX IF NOT EXISTS idx_products_mall_name ON products(mall_name)",
    "CREATE INDEX IF NOT EXISTS idx_products_updated_at ON products(updated_at)",
];

impl Product {
    /// Largest price the `NUMERIC(14, 2)` column can hold.
    pub const MAX_PRICE: f64 = 999_999_999_999.99;

    /// Create the `products` table and its indexes if they are missing.
    pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(pool).await?;
        }
        Ok(())
    }

    /// Insert or overwrite products keyed by id.
    ///
    /// On conflict every mutable column is replaced and `updated_at` refreshed.
    /// Repeated ids in one batch collapse to the last occurrence, since Postgres
    /// refuses to touch the same row twice in a single `ON CONFLICT` statement.
    /// Returns the number of distinct products written.
    pub async fn upsert_many(products: &[Product], pool: &PgPool) -> Result<u64> {
        let rows = dedup_last_wins(products);
        if rows.is_empty() {
            return Ok(0);
        }

        let sql = build_upsert_sql(rows.len());

        let mut query = sqlx::query(&sql);
        for product in &rows {
            query = query
                .bind(&product.id)
                .bind(&product.name)
                .bind(product.price)
                .bind(&product.image_url)
                .bind(&product.url)
                .bind(&product.mall_name)
                .bind(&product.product_type)
                .bind(&product.maker)
                .bind(Json(&product.categories));
        }

        query.execute(pool).await?;

        Ok(rows.len() as u64)
    }

    pub async fn find_by_id(id: &str, pool: &PgPool) -> Result<Option<Self>> {
        let sql = format!("SELECT {} FROM products WHERE id = $1", SELECT_COLUMNS);

        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Fetch several products at once, in the order the ids were given.
    /// Unknown ids are skipped.
    pub async fn find_by_ids(ids: &[String], pool: &PgPool) -> Result<Vec<Self>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {} FROM products
             WHERE id = ANY($1)
             ORDER BY array_position($1, id::text)",
            SELECT_COLUMNS
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(ids)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Case-insensitive substring match on name, most recently updated first.
    pub async fn search_by_name(
        query: &str,
        limit: i64,
        offset: i64,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT {} FROM products
             WHERE name ILIKE $1 ESCAPE '\\'
             ORDER BY updated_at DESC
             LIMIT $2 OFFSET $3",
            SELECT_COLUMNS
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(contains_pattern(query))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    pub async fn ping(pool: &PgPool) -> Result<()> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}

fn dedup_last_wins(products: &[Product]) -> Vec<&Product> {
    let mut rows: Vec<&Product> = Vec::with_capacity(products.len());
    for product in products {
        match rows.iter().position(|p| p.id == product.id) {
            Some(idx) => rows[idx] = product,
            None => rows.push(product),
        }
    }
    rows
}

fn build_upsert_sql(row_count: usize) -> String {
    let mut sql = String::from(
        "INSERT INTO products
            (id, name, price, image_url, url, mall_name, product_type, maker, categories,
             created_at, updated_at)
         VALUES ",
    );

    for row in 0..row_count {
        if row > 0 {
            sql.push_str(", ");
        }
        let base = row * UPSERT_COLUMNS;
        sql.push_str(&format!(
            "(${}, ${}, ${}::numeric, ${}, ${}, ${}, ${}, ${}, ${}::jsonb, NOW(), NOW())",
            base + 1,
            base + 2,
            base + 3,
            base + 4,
            base + 5,
            base + 6,
            base + 7,
            base + 8,
            base + 9
        ));
    }

    sql.push_str(
        " ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            price = EXCLUDED.price,
            image_url = EXCLUDED.image_url,
            url = EXCLUDED.url,
            mall_name = EXCLUDED.mall_name,
            product_type = EXCLUDED.product_type,
            maker = EXCLUDED.maker,
            categories = EXCLUDED.categories,
            updated_at = NOW()",
    );

    sql
}

/// `%query%` with LIKE metacharacters escaped, so a search for `50%` matches
/// the literal text.
fn contains_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
