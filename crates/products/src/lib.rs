//! Products domain module.
//!
//! This crate contains the product record and the rules around it (partial
//! updates, search term classification, spreadsheet import parsing), implemented
//! as deterministic logic (no IO, no HTTP, no storage).

pub mod import;
pub mod product;
pub mod quantity;
pub mod search;

pub use import::{parse_stock_sheet, ImportError, RejectedRow, SheetRecord, StockSheet};
pub use product::{NewProduct, Product, ProductChanges};
pub use quantity::{lenient_quantity, Coerced, Fallback};
pub use search::SearchTerm;
