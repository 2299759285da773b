//! Best-effort persistence of freshly fetched products and their images.

use futures::future::join_all;
use serde::Serialize;
use tracing::warn;

use crate::domains::products::models::Product;
use crate::kernel::{ServerDeps, VariantState};

/// One write that did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistenceFailure {
    /// Product id or image URL
    pub target: String,
    pub error: String,
}

/// Tally of the fan-out writes for one search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistenceReport {
    pub products_saved: usize,
    pub product_failures: Vec<PersistenceFailure>,
    pub images_saved: usize,
    pub image_failures: Vec<PersistenceFailure>,
    /// Images whose original was archived but whose background-removed variant was not
    pub background_failures: Vec<PersistenceFailure>,
}

impl PersistenceReport {
    pub fn is_clean(&self) -> bool {
        self.product_failures.is_empty()
            && self.image_failures.is_empty()
            && self.background_failures.is_empty()
    }
}

/// Save every product row and every product image concurrently.
///
/// One image save per product with a non-empty image URL and one upsert per
/// product. All writes are started together and awaited together. Failures
/// are collected in the report and never abort the other writes.
pub async fn persist_products(
    products: &[Product],
    remove_background: bool,
    deps: &ServerDeps,
) -> PersistenceReport {
    let image_saves = products
        .iter()
        .filter(|p| !p.image_url.is_empty())
        .map(|p| async move {
            let result = deps.image_store.save(&p.image_url, remove_background).await;
            (p.image_url.as_str(), result)
        });

    let product_saves = products.iter().map(|p| async move {
        let result = deps
            .product_store
            .upsert_many(std::slice::from_ref(p))
            .await;
        (p.id.as_str(), result)
    });

    let (image_results, product_results) =
        tokio::join!(join_all(image_saves), join_all(product_saves));

    let mut report = PersistenceReport::default();

    for (url, result) in image_results {
        match result {
            Ok(outcome) => {
                report.images_saved += 1;
                if let VariantState::Failed(reason) = outcome.background_removed {
                    report.background_failures.push(PersistenceFailure {
                        target: url.to_string(),
                        error: reason,
                    });
                }
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to archive product image");
                report.image_failures.push(PersistenceFailure {
                    target: url.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    for (id, result) in product_results {
        match result {
            Ok(_) => report.products_saved += 1,
            Err(e) => {
                warn!(product_id = %id, error = %e, "Failed to cache product");
                report.product_failures.push(PersistenceFailure {
                    target: id.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    report
}
