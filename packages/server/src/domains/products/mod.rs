//! Products domain - shopping search results, cached in Postgres

pub mod activities;
pub mod data;
pub mod errors;
pub mod models;

pub use data::ProductSearchResponse;
pub use errors::{ProductStoreError, SearchError};
pub use models::Product;
