//! Product domain activities - business logic functions

pub mod persist;
pub mod search;

pub use persist::{persist_products, PersistenceFailure, PersistenceReport};
pub use search::{search_products, SearchOutcome, SearchRequest, SearchSource};
