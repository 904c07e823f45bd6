//! Storage layer for refund filings.
//!
//! SQLite persistence for the `returns` table, a synchronous repository, and
//! the async `ReturnStore` handle the service shares between requests.

// SQL strings don't need hash-less raw strings
#![allow(clippy::needless_raw_string_hashes)]

pub mod database;
pub mod error;
pub mod repository;
pub mod store;

pub use database::Database;
pub use error::{StorageError, StorageResult};
pub use repository::{ReturnRepository, SqliteReturnRepository};
pub use store::ReturnStore;
