//! Integration tests for the Postgres product store.
//!
//! Runs against a real Postgres container:
//! - Upsert overwrites by id and never duplicates rows
//! - Name search is case-insensitive, substring, newest first
//! - Schema is created lazily, once, even under concurrent first use

mod common;

use std::sync::Arc;

use crate::common::{sample_product, TestHarness};
use reindeer_core::kernel::{BaseProductStore, PostgresProductStore};
use test_context::test_context;

async fn row_count(ctx: &TestHarness, id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE id = $1")
        .bind(id)
        .fetch_one(&ctx.db_pool)
        .await
        .expect("Failed to count rows")
}

// =============================================================================
// Upsert
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn upsert_overwrites_existing_row(ctx: &TestHarness) {
    let store = ctx.product_store();

    store
        .upsert_many(&[sample_product("p-1", "Old Name")])
        .await
        .unwrap();

    let mut updated = sample_product("p-1", "New Name");
    updated.price = 990.5;
    updated.mall_name = "다른몰".to_string();
    updated.categories = vec!["생활".to_string()];
    store.upsert_many(&[updated.clone()]).await.unwrap();

    assert_eq!(row_count(ctx, "p-1").await, 1);

    let stored = store.get_by_id("p-1").await.unwrap().unwrap();
    assert_eq!(stored, updated);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn upsert_refreshes_updated_at(ctx: &TestHarness) {
    let store = ctx.product_store();
    store
        .upsert_many(&[sample_product("p-1", "Laptop")])
        .await
        .unwrap();

    sqlx::query("UPDATE products SET updated_at = NOW() - INTERVAL '1 day' WHERE id = 'p-1'")
        .execute(&ctx.db_pool)
        .await
        .unwrap();

    store
        .upsert_many(&[sample_product("p-1", "Laptop")])
        .await
        .unwrap();

    let fresh: bool = sqlx::query_scalar(
        "SELECT updated_at > NOW() - INTERVAL '1 hour' FROM products WHERE id = 'p-1'",
    )
    .fetch_one(&ctx.db_pool)
    .await
    .unwrap();
    assert!(fresh);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn duplicate_ids_in_one_batch_keep_last(ctx: &TestHarness) {
    let store = ctx.product_store();

    let written = store
        .upsert_many(&[
            sample_product("p-1", "first"),
            sample_product("p-2", "other"),
            sample_product("p-1", "second"),
        ])
        .await
        .unwrap();

    assert_eq!(written, 2);
    assert_eq!(row_count(ctx, "p-1").await, 1);
    assert_eq!(store.get_by_id("p-1").await.unwrap().unwrap().name, "second");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn empty_batch_is_a_no_op(ctx: &TestHarness) {
    let store = ctx.product_store();
    assert_eq!(store.upsert_many(&[]).await.unwrap(), 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn price_round_trips_with_cents(ctx: &TestHarness) {
    let store = ctx.product_store();
    let mut product = sample_product("p-1", "Cable");
    product.price = 1299000.0;
    store.upsert_many(&[product]).await.unwrap();

    let stored = store.get_by_id("p-1").await.unwrap().unwrap();
    assert_eq!(stored.price, 1299000.0);
}

// =============================================================================
// Lookups
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn get_by_id_missing_is_none(ctx: &TestHarness) {
    let store = ctx.product_store();
    assert!(store.get_by_id("nope").await.unwrap().is_none());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn get_many_by_ids_follows_request_order(ctx: &TestHarness) {
    let store = ctx.product_store();
    store
        .upsert_many(&[
            sample_product("a", "A"),
            sample_product("b", "B"),
            sample_product("c", "C"),
        ])
        .await
        .unwrap();

    let found = store
        .get_many_by_ids(&["c".to_string(), "missing".to_string(), "a".to_string()])
        .await
        .unwrap();

    let ids: Vec<&str> = found.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a"]);
}

// =============================================================================
// Search
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn search_is_case_insensitive_substring(ctx: &TestHarness) {
    let store = ctx.product_store();
    store
        .upsert_many(&[
            sample_product("1", "Samsung Galaxy Book Pro"),
            sample_product("2", "LG gram"),
        ])
        .await
        .unwrap();

    let found = store.search_by_name("galaxy", 50, 0).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "1");

    assert!(store.search_by_name("iphone", 50, 0).await.unwrap().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn search_orders_newest_first_with_paging(ctx: &TestHarness) {
    let store = ctx.product_store();
    for (id, age_minutes) in [("old", 30), ("mid", 20), ("new", 10)] {
        store
            .upsert_many(&[sample_product(id, &format!("노트북 {}", id))])
            .await
            .unwrap();
        sqlx::query("UPDATE products SET updated_at = NOW() - make_interval(mins => $2) WHERE id = $1")
            .bind(id)
            .bind(age_minutes)
            .execute(&ctx.db_pool)
            .await
            .unwrap();
    }

    let all = store.search_by_name("노트북", 50, 0).await.unwrap();
    let ids: Vec<&str> = all.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "mid", "old"]);

    let page = store.search_by_name("노트북", 1, 1).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, "mid");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn search_treats_wildcards_literally(ctx: &TestHarness) {
    let store = ctx.product_store();
    store
        .upsert_many(&[
            sample_product("1", "50% sale cable"),
            sample_product("2", "500 cable"),
        ])
        .await
        .unwrap();

    let found = store.search_by_name("50%", 50, 0).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "1");
}

// =============================================================================
// Lazy schema init
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn schema_created_on_first_use(ctx: &TestHarness) {
    let exists: Option<String> = sqlx::query_scalar("SELECT to_regclass('products')::text")
        .fetch_one(&ctx.db_pool)
        .await
        .unwrap();
    assert!(exists.is_none());

    let store = ctx.product_store();
    assert!(store.search_by_name("anything", 50, 0).await.unwrap().is_empty());

    let exists: Option<String> = sqlx::query_scalar("SELECT to_regclass('products')::text")
        .fetch_one(&ctx.db_pool)
        .await
        .unwrap();
    assert_eq!(exists.as_deref(), Some("products"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn concurrent_first_use_initialises_once(ctx: &TestHarness) {
    let store = Arc::new(PostgresProductStore::new(ctx.db_pool.clone()));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .upsert_many(&[sample_product(&format!("p-{}", i), "concurrent")])
                    .await
            })
        })
        .collect();

    for task in futures::future::join_all(tasks).await {
        task.unwrap().unwrap();
    }

    let found = store.search_by_name("concurrent", 50, 0).await.unwrap();
    assert_eq!(found.len(), 16);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn closed_pool_reports_unavailable(ctx: &TestHarness) {
    let store = ctx.product_store();
    ctx.db_pool.close().await;

    let err = store.search_by_name("x", 50, 0).await.unwrap_err();
    assert!(err.is_unavailable(), "expected unavailable, got {err}");
}
