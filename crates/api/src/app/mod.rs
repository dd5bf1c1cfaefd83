//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage wiring
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request parsing and JSON projections
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::config::ApiConfig;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(config).await?);
    Ok(router(services, config.max_upload_bytes))
}

/// Router over already-built services.
///
/// Product routes are mounted twice: at the root and under `/api`, which is
/// the prefix the front-end calls through.
pub fn router(services: Arc<AppServices>, max_upload_bytes: usize) -> Router {
    let products = routes::router()
        .layer(Extension(services))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(products.clone())
        .nest("/api", products)
        .layer(ServiceBuilder::new())
}
