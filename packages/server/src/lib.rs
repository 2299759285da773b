// Reindeer - Product Search API Core
//
// Searches a shopping API, caches results in Postgres and archives product
// images in S3-compatible storage.
//
// domains/ holds business logic, kernel/ holds infrastructure adapters.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
