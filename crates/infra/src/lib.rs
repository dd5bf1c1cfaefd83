//! Infrastructure layer: product storage.

pub mod repository;
pub mod sqlite;

pub use repository::{ImportOutcome, Page, PageRequest, ProductRepository, StoreError};
pub use sqlite::SqliteProductStore;
