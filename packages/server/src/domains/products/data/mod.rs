pub mod search;

pub use search::ProductSearchResponse;
