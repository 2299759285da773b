// Common test utilities
#![allow(dead_code)]

pub mod fixtures;
pub mod harness;
pub mod server;

pub use fixtures::*;
pub use harness::*;
pub use server::*;
