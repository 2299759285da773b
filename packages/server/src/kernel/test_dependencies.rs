// Test doubles for the kernel traits
//
// In-memory implementations that can be injected into ServerDeps for tests
// and local runs without Postgres, S3 or shopping API credentials.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::{
    BaseBackgroundRemover, BaseImageStore, BaseObjectStorage, BaseProductFetcher,
    BaseProductStore, FetchOutcome, FetchSort, ImageSaveOutcome, ImageStoreError, VariantState,
};
use crate::common::utils::image_id_for_url;
use crate::domains::products::errors::ProductStoreError;
use crate::domains::products::models::Product;

// =============================================================================
// Mock Product Fetcher
// =============================================================================

/// Arguments captured from a fetch call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCallArgs {
    pub query: String,
    pub display: u32,
    pub start: u32,
    pub sort: FetchSort,
}

#[derive(Default)]
pub struct MockProductFetcher {
    responses: Arc<Mutex<Vec<FetchOutcome>>>,
    calls: Arc<Mutex<Vec<FetchCallArgs>>>,
    delay: Option<Duration>,
}

impl MockProductFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue products to be returned by the next fetch
    pub fn with_products(self, products: Vec<Product>) -> Self {
        self.responses.lock().unwrap().push(FetchOutcome {
            products,
            ..Default::default()
        });
        self
    }

    pub fn with_outcome(self, outcome: FetchOutcome) -> Self {
        self.responses.lock().unwrap().push(outcome);
        self
    }

    /// Sleep before answering each fetch
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<FetchCallArgs> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl BaseProductFetcher for MockProductFetcher {
    async fn fetch(&self, query: &str, display: u32, start: u32, sort: FetchSort) -> FetchOutcome {
        self.calls.lock().unwrap().push(FetchCallArgs {
            query: query.to_string(),
            display,
            start,
            sort,
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            FetchOutcome::default()
        } else {
            responses.remove(0)
        }
    }
}

// =============================================================================
// In-memory Product Store
// =============================================================================

#[derive(Default)]
struct ProductTable {
    /// (product, update sequence); higher sequence = more recently updated
    rows: Vec<(Product, u64)>,
    next_seq: u64,
}

/// Product store backed by a Vec. Mirrors the Postgres semantics closely
/// enough for orchestration tests: upsert by id, case-insensitive substring
/// search, newest first.
#[derive(Default)]
pub struct InMemoryProductStore {
    table: Mutex<ProductTable>,
    unavailable: AtomicBool,
    upsert_calls: Mutex<Vec<Vec<String>>>,
    fail_ids: Mutex<Vec<String>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(self, products: Vec<Product>) -> Self {
        {
            let mut table = self.table.lock().unwrap();
            for product in products {
                table.upsert(product);
            }
        }
        self
    }

    /// Every call fails as if the pool could not reach the database
    pub fn unavailable(self) -> Self {
        self.unavailable.store(true, Ordering::SeqCst);
        self
    }

    /// Upserts containing this id fail with a database error
    pub fn failing_on(self, id: &str) -> Self {
        self.fail_ids.lock().unwrap().push(id.to_string());
        self
    }

    pub fn all(&self) -> Vec<Product> {
        self.table
            .lock()
            .unwrap()
            .rows
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Ids passed to each upsert call, in call order
    pub fn upsert_calls(&self) -> Vec<Vec<String>> {
        self.upsert_calls.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<(), ProductStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(ProductStoreError::Unavailable(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }
}

impl ProductTable {
    fn upsert(&mut self, product: Product) {
        self.next_seq += 1;
        let seq = self.next_seq;
        match self.rows.iter_mut().find(|(p, _)| p.id == product.id) {
            Some(row) => *row = (product, seq),
            None => self.rows.push((product, seq)),
        }
    }
}

#[async_trait]
impl BaseProductStore for InMemoryProductStore {
    async fn upsert_many(&self, products: &[Product]) -> Result<u64, ProductStoreError> {
        self.check_available()?;
        self.upsert_calls
            .lock()
            .unwrap()
            .push(products.iter().map(|p| p.id.clone()).collect());

        let fail_ids = self.fail_ids.lock().unwrap().clone();
        if products.iter().any(|p| fail_ids.contains(&p.id)) {
            return Err(ProductStoreError::Database(sqlx::Error::Protocol(
                "simulated write failure".to_string(),
            )));
        }

        let mut table = self.table.lock().unwrap();
        for product in products {
            table.upsert(product.clone());
        }
        Ok(products.len() as u64)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Product>, ProductStoreError> {
        self.check_available()?;
        Ok(self
            .table
            .lock()
            .unwrap()
            .rows
            .iter()
            .find(|(p, _)| p.id == id)
            .map(|(p, _)| p.clone()))
    }

    async fn get_many_by_ids(&self, ids: &[String]) -> Result<Vec<Product>, ProductStoreError> {
        self.check_available()?;
        let table = self.table.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| table.rows.iter().find(|(p, _)| &p.id == id))
            .map(|(p, _)| p.clone())
            .collect())
    }

    async fn search_by_name(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, ProductStoreError> {
        self.check_available()?;
        let needle = query.to_lowercase();
        let table = self.table.lock().unwrap();

        let mut matches: Vec<&(Product, u64)> = table
            .rows
            .iter()
            .filter(|(p, _)| p.name.to_lowercase().contains(&needle))
            .collect();
        matches.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(matches
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|(p, _)| p.clone())
            .collect())
    }

    async fn ping(&self) -> Result<(), ProductStoreError> {
        self.check_available()
    }
}

// =============================================================================
// Mock Image Store
// =============================================================================

/// Arguments captured from a save call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveCallArgs {
    pub image_url: String,
    pub remove_background: bool,
}

#[derive(Default)]
pub struct MockImageStore {
    calls: Arc<Mutex<Vec<SaveCallArgs>>>,
    saved: Arc<Mutex<HashMap<String, bool>>>,
    fail_urls: Arc<Mutex<Vec<String>>>,
}

impl MockImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves of this URL fail with a download error
    pub fn failing_on(self, url: &str) -> Self {
        self.fail_urls.lock().unwrap().push(url.to_string());
        self
    }

    pub fn calls(&self) -> Vec<SaveCallArgs> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_saved(&self, url: &str) -> bool {
        self.saved.lock().unwrap().contains_key(&image_id_for_url(url))
    }
}

#[async_trait]
impl BaseImageStore for MockImageStore {
    async fn save(
        &self,
        image_url: &str,
        remove_background: bool,
    ) -> Result<ImageSaveOutcome, ImageStoreError> {
        self.calls.lock().unwrap().push(SaveCallArgs {
            image_url: image_url.to_string(),
            remove_background,
        });

        if self.fail_urls.lock().unwrap().iter().any(|u| u == image_url) {
            return Err(ImageStoreError::Download {
                url: image_url.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            });
        }

        let image_id = image_id_for_url(image_url);
        self.saved
            .lock()
            .unwrap()
            .insert(image_id.clone(), remove_background);

        Ok(ImageSaveOutcome {
            image_id,
            original: VariantState::Stored,
            background_removed: if remove_background {
                VariantState::Stored
            } else {
                VariantState::NotRequested
            },
        })
    }

    async fn get(
        &self,
        image_id: &str,
        with_background: bool,
    ) -> Result<Option<String>, ImageStoreError> {
        let saved = self.saved.lock().unwrap();
        Ok(match saved.get(image_id) {
            Some(_) if with_background => Some(format!("memory://images/original/{}.jpg", image_id)),
            Some(true) => Some(format!("memory://images/no-bg/{}.png", image_id)),
            _ => None,
        })
    }
}

// =============================================================================
// In-memory Object Storage
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
pub struct InMemoryObjectStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
    put_count: Mutex<usize>,
}

impl InMemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn put_count(&self) -> usize {
        *self.put_count.lock().unwrap()
    }
}

#[async_trait]
impl BaseObjectStorage for InMemoryObjectStorage {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        *self.put_count.lock().unwrap() += 1;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn presigned_get_url(&self, key: &str, expires_in: Duration) -> Result<String> {
        Ok(format!("memory://{}?expires_in={}", key, expires_in.as_secs()))
    }
}

// =============================================================================
// Mock Background Remover
// =============================================================================

/// Returns a fixed PNG payload, or fails every call when built with `failing()`
#[derive(Default)]
pub struct MockBackgroundRemover {
    fail: bool,
    calls: Mutex<usize>,
}

impl MockBackgroundRemover {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl BaseBackgroundRemover for MockBackgroundRemover {
    fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            anyhow::bail!("simulated background removal failure");
        }
        let mut out = b"\x89PNG\r\n\x1a\n".to_vec();
        out.extend_from_slice(image);
        Ok(out)
    }
}
