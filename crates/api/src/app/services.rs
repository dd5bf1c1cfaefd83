use std::sync::Arc;

use estoque_infra::{ProductRepository, SqliteProductStore, StoreError};

use crate::config::ApiConfig;

/// Handles shared by every request.
#[derive(Clone)]
pub struct AppServices {
    products: Arc<dyn ProductRepository>,
}

impl AppServices {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }

    pub fn products(&self) -> &dyn ProductRepository {
        self.products.as_ref()
    }
}

pub async fn build_services(config: &ApiConfig) -> Result<AppServices, StoreError> {
    let store = SqliteProductStore::connect(&config.database_url).await?;
    tracing::info!(database_url = %config.database_url, "product store ready");
    Ok(AppServices::new(Arc::new(store)))
}
