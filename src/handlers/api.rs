use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

use crate::models::{Product, ProductListParams, ProductPage, ServiceError};
use crate::observability::BusinessTracingMiddleware;
use crate::services::{CartService, CatalogService};

pub(crate) const SUCCESS: &str = "success";

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<Value>);

/// Shared state for the catalog and cart endpoints
#[derive(Clone)]
pub struct ApiState {
    pub catalog_service: Arc<CatalogService>,
    pub cart_service: Arc<CartService>,
    pub business: BusinessTracingMiddleware,
    pub default_cart_id: Option<String>,
    pub default_page_size: u32,
}

#[derive(Debug, Serialize)]
pub struct ProductPageResponse {
    pub status: &'static str,
    pub payload: ProductPage,
    /// Present when a default cart is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub status: &'static str,
    pub product: Product,
}

/// List products with pagination, sorting and filtering
#[instrument(name = "list_products", skip(state, params))]
pub async fn list_products(
    State(state): State<ApiState>,
    params: Result<Query<ProductListParams>, QueryRejection>,
) -> Result<Json<ProductPageResponse>, ApiError> {
    let Query(params) = params.map_err(|rejection| {
        error_response(StatusCode::BAD_REQUEST, &rejection.body_text())
    })?;

    let query = params
        .into_query(state.default_page_size)
        .map_err(|err| service_error_to_response(err.into()))?;
    let category = query.filter.category.clone();

    let page = state
        .business
        .trace_catalog_operation(
            "list_products",
            category.as_deref(),
            state.catalog_service.list_products(query),
        )
        .await
        .map_err(service_error_to_response)?;

    crate::info_with_trace!(
        "Listed page {} of {} with {} products",
        page.page,
        page.total_pages,
        page.items.len()
    );

    Ok(Json(ProductPageResponse {
        status: SUCCESS,
        payload: page,
        cart_id: state.default_cart_id.clone(),
    }))
}

/// Get a specific product by ID
#[instrument(name = "get_product", skip(state), fields(product_id = %product_id))]
pub async fn get_product(
    State(state): State<ApiState>,
    Path(product_id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .business
        .trace_catalog_operation(
            "get_product",
            None,
            state.catalog_service.get_product(&product_id),
        )
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(ProductResponse {
        status: SUCCESS,
        product,
    }))
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(json!({
            "status": "error",
            "error": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// Map a service failure to its HTTP status and error body.
/// Repository failures are logged and reported without detail.
pub(crate) fn service_error_to_response(err: ServiceError) -> ApiError {
    let status = match &err {
        ServiceError::ProductNotFound { .. }
        | ServiceError::CartNotFound { .. }
        | ServiceError::CartLineNotFound { .. } => StatusCode::NOT_FOUND,
        ServiceError::InvalidQuantity { .. } | ServiceError::ValidationError { .. } => {
            StatusCode::BAD_REQUEST
        }
        ServiceError::StockExceeded { .. } => StatusCode::CONFLICT,
        ServiceError::Repository { .. } => {
            crate::error_with_trace!(error = %err, "Request failed in the persistence layer");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    error_response(status, &err.to_string())
}
