// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only. The search flow itself lives in
// domains/products/activities and talks to these seams.
//
// Naming convention: Base* for trait names (e.g., BaseProductStore)

use std::time::Duration;

use async_trait::async_trait;

use crate::common::utils::image_id_for_url;
use crate::domains::products::errors::ProductStoreError;
use crate::domains::products::models::Product;
use crate::kernel::image_store::ImageStoreError;

// =============================================================================
// Product Fetcher (shopping search API)
// =============================================================================

/// Sort order accepted by the shopping search API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchSort {
    /// Relevance
    #[default]
    Sim,
    Date,
    /// Price ascending
    Asc,
    /// Price descending
    Dsc,
}

impl FetchSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchSort::Sim => "sim",
            FetchSort::Date => "date",
            FetchSort::Asc => "asc",
            FetchSort::Dsc => "dsc",
        }
    }
}

impl std::str::FromStr for FetchSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sim" => Ok(FetchSort::Sim),
            "date" => Ok(FetchSort::Date),
            "asc" => Ok(FetchSort::Asc),
            "dsc" => Ok(FetchSort::Dsc),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

/// Why a whole fetch came back empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
    #[error("shopping API rejected the client credentials")]
    Unauthorized,

    #[error("shopping API returned HTTP {0}")]
    Status(u16),

    #[error("shopping API request failed: {0}")]
    Transport(String),

    #[error("shopping API response could not be decoded: {0}")]
    Decode(String),
}

/// An item in the upstream response that could not be mapped to a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    /// Position of the item in the upstream `items` array
    pub index: usize,
    pub reason: String,
}

/// Result of one upstream search.
///
/// Never an error: a failed request yields no products plus `failure`,
/// and malformed items are listed in `skipped`.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub products: Vec<Product>,
    pub skipped: Vec<SkippedItem>,
    pub failure: Option<FetchFailure>,
}

impl FetchOutcome {
    pub fn failed(failure: FetchFailure) -> Self {
        Self {
            products: Vec::new(),
            skipped: Vec::new(),
            failure: Some(failure),
        }
    }
}

#[async_trait]
pub trait BaseProductFetcher: Send + Sync {
    /// Search the shopping API.
    ///
    /// `display` is clamped to 1..=100 and `start` to at least 1.
    async fn fetch(&self, query: &str, display: u32, start: u32, sort: FetchSort)
        -> FetchOutcome;
}

// =============================================================================
// Product Store (relational cache)
// =============================================================================

#[async_trait]
pub trait BaseProductStore: Send + Sync {
    /// Insert or overwrite products keyed by id. Returns rows written.
    async fn upsert_many(&self, products: &[Product]) -> Result<u64, ProductStoreError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Product>, ProductStoreError>;

    async fn get_many_by_ids(&self, ids: &[String]) -> Result<Vec<Product>, ProductStoreError>;

    /// Case-insensitive substring search on name, newest first.
    async fn search_by_name(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, ProductStoreError>;

    /// Cheap connectivity check for health endpoints.
    async fn ping(&self) -> Result<(), ProductStoreError>;
}

// =============================================================================
// Image Store (archived product images)
// =============================================================================

/// What happened to one image variant during a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantState {
    /// Already in storage, nothing written
    Existing,
    /// Written by this call
    Stored,
    /// Caller did not ask for this variant
    NotRequested,
    Failed(String),
}

impl VariantState {
    pub fn is_present(&self) -> bool {
        matches!(self, VariantState::Existing | VariantState::Stored)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSaveOutcome {
    pub image_id: String,
    pub original: VariantState,
    pub background_removed: VariantState,
}

impl ImageSaveOutcome {
    pub fn original_saved(&self) -> bool {
        self.original.is_present()
    }

    pub fn background_variant_saved(&self) -> bool {
        self.background_removed.is_present()
    }
}

#[async_trait]
pub trait BaseImageStore: Send + Sync {
    /// Archive the image at `image_url`, optionally with a background-removed
    /// variant. Idempotent per URL.
    async fn save(
        &self,
        image_url: &str,
        remove_background: bool,
    ) -> Result<ImageSaveOutcome, ImageStoreError>;

    /// Time-limited download URL for a stored image, `None` if it was never saved.
    /// `with_background = false` selects the background-removed variant.
    async fn get(
        &self,
        image_id: &str,
        with_background: bool,
    ) -> Result<Option<String>, ImageStoreError>;

    async fn get_by_url(
        &self,
        image_url: &str,
        with_background: bool,
    ) -> Result<Option<String>, ImageStoreError> {
        self.get(&image_id_for_url(image_url), with_background).await
    }
}

// =============================================================================
// Object Storage (S3-compatible)
// =============================================================================

#[async_trait]
pub trait BaseObjectStorage: Send + Sync {
    async fn exists(&self, key: &str) -> anyhow::Result<bool>;

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> anyhow::Result<()>;

    async fn presigned_get_url(&self, key: &str, expires_in: Duration) -> anyhow::Result<String>;
}

// =============================================================================
// Background Removal (CPU-bound, called from the blocking pool)
// =============================================================================

pub trait BaseBackgroundRemover: Send + Sync {
    /// Return PNG bytes with the background made transparent.
    fn remove_background(&self, image: &[u8]) -> anyhow::Result<Vec<u8>>;
}
