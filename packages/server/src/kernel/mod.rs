//! Kernel module - server infrastructure and dependencies.

pub mod background_removal;
pub mod deps;
pub mod image_store;
pub mod naver_client;
pub mod object_storage;
pub mod product_store;
pub mod test_dependencies;
pub mod traits;

pub use background_removal::EdgeFloodRemover;
pub use deps::{ServerDeps, ServerRuntime};
pub use image_store::{ImageStoreError, ObjectImageStore, PRESIGNED_URL_TTL};
pub use naver_client::NaverFetcher;
pub use object_storage::{S3ObjectStorage, S3Settings};
pub use product_store::PostgresProductStore;
pub use traits::*;
