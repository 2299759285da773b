//! Product image archive on top of object storage.
//!
//! Images are keyed by the MD5 of their source URL:
//!
//! ```text
//! images/original/{id}.jpg   original bytes as downloaded
//! images/no-bg/{id}.png      background removed
//! ```
//!
//! Both keys are checked before any download, so saving the same URL twice
//! touches the network only once.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{BaseBackgroundRemover, BaseImageStore, BaseObjectStorage, ImageSaveOutcome, VariantState};
use crate::common::utils::{
    image_id_for_url, no_background_key, original_key, NO_BACKGROUND_CONTENT_TYPE,
    ORIGINAL_CONTENT_TYPE,
};

/// Lifetime of URLs handed out by `get`.
pub const PRESIGNED_URL_TTL: Duration = Duration::from_secs(3600);

#[derive(Error, Debug)]
pub enum ImageStoreError {
    #[error("image download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("object storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub struct ObjectImageStore {
    storage: Arc<dyn BaseObjectStorage>,
    remover: Arc<dyn BaseBackgroundRemover>,
    http: reqwest::Client,
}

impl ObjectImageStore {
    pub fn new(
        storage: Arc<dyn BaseObjectStorage>,
        remover: Arc<dyn BaseBackgroundRemover>,
        download_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(download_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            storage,
            remover,
            http,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ImageStoreError> {
        let failed = |reason: String| ImageStoreError::Download {
            url: url.to_string(),
            reason,
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// Derive and upload the background-removed variant.
    ///
    /// Decoding and masking are CPU-bound, so they run on the blocking pool.
    async fn store_without_background(&self, key: &str, original: Vec<u8>) -> anyhow::Result<()> {
        let remover = self.remover.clone();
        let png = tokio::task::spawn_blocking(move || remover.remove_background(&original))
            .await
            .context("Background removal task panicked")??;

        self.storage
            .put(key, png, NO_BACKGROUND_CONTENT_TYPE)
            .await
    }
}

#[async_trait]
impl BaseImageStore for ObjectImageStore {
    async fn save(
        &self,
        image_url: &str,
        remove_background: bool,
    ) -> Result<ImageSaveOutcome, ImageStoreError> {
        let image_id = image_id_for_url(image_url);
        let original = original_key(&image_id);
        let no_bg = no_background_key(&image_id);

        let original_exists = self.storage.exists(&original).await?;
        let no_bg_exists = if remove_background {
            self.storage.exists(&no_bg).await?
        } else {
            false
        };

        if original_exists && (!remove_background || no_bg_exists) {
            debug!(image_id = %image_id, "Image already archived");
            return Ok(ImageSaveOutcome {
                image_id,
                original: VariantState::Existing,
                background_removed: if remove_background {
                    VariantState::Existing
                } else {
                    VariantState::NotRequested
                },
            });
        }

        let bytes = self.download(image_url).await?;

        let original_state = if original_exists {
            VariantState::Existing
        } else {
            self.storage
                .put(&original, bytes.clone(), ORIGINAL_CONTENT_TYPE)
                .await?;
            VariantState::Stored
        };

        let background_state = if !remove_background {
            VariantState::NotRequested
        } else if no_bg_exists {
            VariantState::Existing
        } else {
            match self.store_without_background(&no_bg, bytes).await {
                Ok(()) => VariantState::Stored,
                Err(e) => {
                    warn!(
                        image_id = %image_id,
                        url = %image_url,
                        error = %e,
                        "Background removal failed, keeping original only"
                    );
                    VariantState::Failed(e.to_string())
                }
            }
        };

        info!(
            image_id = %image_id,
            original = ?original_state,
            background_removed = ?background_state,
            "Image archived"
        );

        Ok(ImageSaveOutcome {
            image_id,
            original: original_state,
            background_removed: background_state,
        })
    }

    async fn get(
        &self,
        image_id: &str,
        with_background: bool,
    ) -> Result<Option<String>, ImageStoreError> {
        let key = if with_background {
            original_key(image_id)
        } else {
            no_background_key(image_id)
        };

        if !self.storage.exists(&key).await? {
            return Ok(None);
        }

        let url = self
            .storage
            .presigned_get_url(&key, PRESIGNED_URL_TTL)
            .await?;

        Ok(Some(url))
    }
}
