use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::JsonRejection,
        Extension, Multipart, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::Value;

use estoque_core::ProductCode;
use estoque_infra::PageRequest;
use estoque_products::{parse_stock_sheet, SearchTerm};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

/// Multipart field carrying the spreadsheet.
const FILE_FIELD: &str = "file";

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/buscar", get(search_products))
        .route("/upload", post(upload_sheet))
        .route("/:cod", put(update_product))
}

pub async fn search_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::SearchParams>,
) -> axum::response::Response {
    let Some(term) = params.termo.as_deref().and_then(SearchTerm::parse) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "missing_search_term", "search term required");
    };

    match services.products().search(&term).await {
        Ok(found) => (StatusCode::OK, Json(dto::products_to_json(&found))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<Value>, JsonRejection>,
) -> axum::response::Response {
    let body = match body {
        Ok(Json(v)) => v,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                dto::PRODUCT_CODE_REQUIRED,
            )
        }
    };

    let new_product = match dto::parse_create_request(body) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let product = new_product.into_product();
    if let Err(e) = services.products().insert(&product).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(cod = %product.code(), "product created");
    (StatusCode::CREATED, Json(dto::product_to_json(&product))).into_response()
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(cod): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> axum::response::Response {
    // A path that is not a code can never name a stored product.
    let code: ProductCode = match cod.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", errors::PRODUCT_NOT_FOUND),
    };

    let body = match body {
        Ok(Json(v)) => v,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                dto::INVALID_REQUEST_BODY,
            )
        }
    };

    let changes = match dto::parse_update_request(body) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.products().update(code, &changes).await {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::ListParams>,
) -> axum::response::Response {
    let request = PageRequest::new(params.page(), params.per_page());

    match services.products().list_page(request).await {
        Ok(page) => (StatusCode::OK, Json(dto::page_to_json(&page))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn upload_sheet(
    Extension(services): Extension<Arc<AppServices>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> axum::response::Response {
    let Ok(mut multipart) = multipart else {
        return errors::json_error(StatusCode::BAD_REQUEST, "missing_file", "no file uploaded");
    };

    let mut upload = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return errors::json_error(e.status(), "invalid_upload", e.body_text()),
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(bytes) => upload = Some((filename, bytes)),
            Err(e) => return errors::json_error(e.status(), "invalid_upload", e.body_text()),
        }
        break;
    }

    let Some((filename, bytes)) = upload else {
        return errors::json_error(StatusCode::BAD_REQUEST, "missing_file", "no file uploaded");
    };
    if filename.is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "missing_file", "no file selected");
    }
    if !filename.ends_with(".csv") {
        return errors::json_error(StatusCode::BAD_REQUEST, "unsupported_file", "only CSV files accepted");
    }

    let parsed = tokio::task::spawn_blocking(move || parse_stock_sheet(&bytes)).await;
    let sheet = match parsed {
        Ok(Ok(sheet)) => sheet,
        Ok(Err(e)) => return errors::import_error_to_response(e),
        Err(e) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "import_failed",
                format!("failed to process spreadsheet: {e}"),
            )
        }
    };

    let outcome = match services.products().apply_import(&sheet.records).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, filename = %filename, "spreadsheet import aborted");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "import_failed",
                format!("failed to process spreadsheet: {e}"),
            );
        }
    };

    let mut rejected = sheet.rejected;
    rejected.extend(outcome.rejected.iter().cloned());
    rejected.sort_by_key(|row| row.line);

    tracing::info!(
        filename = %filename,
        inserted = outcome.inserted,
        updated = outcome.updated,
        rejected = rejected.len(),
        blank_codes = sheet.blank_codes,
        "spreadsheet imported"
    );

    (StatusCode::OK, Json(dto::import_summary_to_json(&outcome, &rejected))).into_response()
}
