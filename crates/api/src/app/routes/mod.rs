use axum::Router;

pub mod products;
pub mod system;

/// Router for the product endpoints (mounted at the root and under `/api`).
pub fn router() -> Router {
    Router::new().nest("/produtos", products::router())
}
