//! Storage abstraction for products.
//!
//! Handlers receive an explicit `Arc<dyn ProductRepository>`; there is no
//! process-global session. Each method is its own unit of work.

use thiserror::Error;

use estoque_core::ProductCode;
use estoque_products::{Product, ProductChanges, RejectedRow, SearchTerm, SheetRecord};

/// Storage operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Insert hit the primary key of an existing product.
    #[error("product {0} already exists")]
    Duplicate(ProductCode),

    #[error("product {0} not found")]
    NotFound(ProductCode),

    #[error("database error in {operation}: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    pub fn database(operation: &'static str, source: sqlx::Error) -> Self {
        Self::Database { operation, source }
    }
}

/// Pagination parameters for listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub const DEFAULT_PER_PAGE: u64 = 50;
    pub const MAX_PER_PAGE: u64 = 100;

    /// Out-of-range values fall back: `page < 1` becomes 1, `per_page < 1`
    /// becomes the default, and `per_page` is capped at [`Self::MAX_PER_PAGE`].
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        let page = page.and_then(|p| u64::try_from(p).ok()).filter(|p| *p >= 1).unwrap_or(1);
        let per_page = per_page
            .and_then(|p| u64::try_from(p).ok())
            .filter(|p| *p >= 1)
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .min(Self::MAX_PER_PAGE);
        Self { page, per_page }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the totals needed to navigate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total rows across all pages.
    pub total: u64,
    /// Number of pages (0 when there are no rows).
    pub pages: u64,
    /// The page that was requested, even if past the end.
    pub page: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            pages: total.div_ceil(request.per_page),
            page: request.page,
        }
    }
}

/// Counts from applying an imported sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub inserted: usize,
    pub updated: usize,
    /// Rows the store could not write; the rest of the batch still commits.
    pub rejected: Vec<RejectedRow>,
}

#[async_trait::async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_code(&self, code: ProductCode) -> Result<Option<Product>, StoreError>;

    /// Case-insensitive substring match on the name, ordered by code.
    async fn search_by_name(&self, fragment: &str) -> Result<Vec<Product>, StoreError>;

    /// Insert a new product. Fails with [`StoreError::Duplicate`] if the code is taken.
    async fn insert(&self, product: &Product) -> Result<(), StoreError>;

    /// Apply a partial update atomically and return the stored result.
    async fn update(&self, code: ProductCode, changes: &ProductChanges) -> Result<Product, StoreError>;

    /// Page through all products ordered by code ascending.
    async fn list_page(&self, request: PageRequest) -> Result<Page<Product>, StoreError>;

    /// Insert or fully overwrite every record in one transaction.
    async fn apply_import(&self, records: &[SheetRecord]) -> Result<ImportOutcome, StoreError>;

    /// Run a classified search term.
    async fn search(&self, term: &SearchTerm) -> Result<Vec<Product>, StoreError> {
        match term {
            SearchTerm::Code(code) => Ok(self.find_by_code(*code).await?.into_iter().collect()),
            SearchTerm::UnknownCode => Ok(Vec::new()),
            SearchTerm::Name(fragment) => self.search_by_name(fragment).await,
        }
    }
}
