use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use estoque_core::DomainError;
use estoque_infra::StoreError;
use estoque_products::ImportError;

pub const PRODUCT_NOT_FOUND: &str = "product not found";

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Duplicate(_) => json_error(
            StatusCode::BAD_REQUEST,
            "duplicate_code",
            "product with this code already exists",
        ),
        StoreError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", PRODUCT_NOT_FOUND),
        StoreError::Database { .. } => {
            tracing::error!(error = %err, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_product_code", "invalid product code")
        }
    }
}

/// Structural spreadsheet failures are server errors carrying the cause.
pub fn import_error_to_response(err: ImportError) -> axum::response::Response {
    tracing::warn!(error = %err, "spreadsheet rejected");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "import_failed",
        format!("failed to process spreadsheet: {err}"),
    )
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": message.into(),
            "code": code,
        })),
    )
        .into_response()
}
