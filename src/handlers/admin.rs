use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal_macros::dec;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::api::{
    error_response, service_error_to_response, ApiError, ProductResponse, SUCCESS,
};
use super::cart::rejection_to_response;
use crate::models::{CreateProductRequest, ProductStatus, UpdateProductRequest};
use crate::observability::BusinessTracingMiddleware;
use crate::repositories::TableManager;
use crate::services::CatalogService;

/// Admin state containing services
#[derive(Clone)]
pub struct AdminState {
    pub catalog_service: Arc<CatalogService>,
    pub table_manager: Arc<TableManager>,
    pub business: BusinessTracingMiddleware,
    pub products_table_name: String,
    pub carts_table_name: String,
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub status: &'static str,
    pub message: String,
    pub products_created: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct SetupTablesResponse {
    pub status: &'static str,
    pub message: String,
    pub tables: Vec<String>,
    pub timestamp: String,
}

/// Create the products and carts tables if they do not exist yet
#[instrument(name = "setup_tables", skip(state), fields(
    products_table = %state.products_table_name,
    carts_table = %state.carts_table_name,
))]
pub async fn setup_tables(
    State(state): State<AdminState>,
) -> Result<Json<SetupTablesResponse>, ApiError> {
    info!("Setting up DynamoDB tables");

    state
        .table_manager
        .create_all_tables(&state.products_table_name, &state.carts_table_name)
        .await
        .map_err(|err| {
            error!("Failed to create tables: {}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create tables")
        })?;

    let tables = vec![
        state.products_table_name.clone(),
        state.carts_table_name.clone(),
    ];

    Ok(Json(SetupTablesResponse {
        status: SUCCESS,
        message: format!("{} tables ready", tables.len()),
        tables,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// Insert the sample catalog. Partial success is reported as success.
#[instrument(name = "seed_database", skip(state), fields(
    products_table = %state.products_table_name,
))]
pub async fn seed_database(
    State(state): State<AdminState>,
) -> Result<Json<SeedResponse>, ApiError> {
    info!("Seeding database with sample products");

    let mut created_count = 0;
    let mut failed_count = 0;

    for request in sample_products() {
        let code = request.code.clone();
        match state.catalog_service.create_product(request).await {
            Ok(_) => created_count += 1,
            Err(err) => {
                warn!("Failed to seed product {}: {}", code, err);
                failed_count += 1;
            }
        }
    }

    if created_count == 0 && failed_count > 0 {
        error!("Seeding failed for every sample product");
        return Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to seed database",
        ));
    }

    let message = if failed_count == 0 {
        format!("Database seeded with {} products", created_count)
    } else {
        format!(
            "Database seeded with {} products, {} failed",
            created_count, failed_count
        )
    };
    info!("{}", message);

    Ok(Json(SeedResponse {
        status: SUCCESS,
        message,
        products_created: created_count,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

#[instrument(name = "create_product", skip(state, body))]
pub async fn create_product(
    State(state): State<AdminState>,
    body: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let Json(request) = body.map_err(rejection_to_response)?;
    let category = request.category.clone();

    let product = state
        .business
        .trace_catalog_operation(
            "create_product",
            Some(&category),
            state.catalog_service.create_product(request),
        )
        .await
        .map_err(service_error_to_response)?;

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            status: SUCCESS,
            product,
        }),
    ))
}

#[instrument(name = "update_product", skip(state, body), fields(product_id = %product_id))]
pub async fn update_product(
    State(state): State<AdminState>,
    Path(product_id): Path<String>,
    body: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<ProductResponse>, ApiError> {
    let Json(patch) = body.map_err(rejection_to_response)?;

    let product = state
        .business
        .trace_catalog_operation(
            "update_product",
            None,
            state.catalog_service.update_product(&product_id, patch),
        )
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(ProductResponse {
        status: SUCCESS,
        product,
    }))
}

/// Hard delete; carts that reference the product keep their line
#[instrument(name = "delete_product", skip(state), fields(product_id = %product_id))]
pub async fn delete_product(
    State(state): State<AdminState>,
    Path(product_id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .business
        .trace_catalog_operation(
            "delete_product",
            None,
            state.catalog_service.delete_product(&product_id),
        )
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(ProductResponse {
        status: SUCCESS,
        product,
    }))
}

fn sample_product(
    title: &str,
    description: &str,
    code: &str,
    price: rust_decimal::Decimal,
    stock: u32,
    category: &str,
) -> CreateProductRequest {
    CreateProductRequest {
        title: title.to_string(),
        description: description.to_string(),
        code: code.to_string(),
        price,
        stock,
        category: category.to_string(),
        status: ProductStatus::Active,
    }
}

pub(crate) fn sample_products() -> Vec<CreateProductRequest> {
    vec![
        sample_product(
            "Yerba Mate 1kg",
            "Traditional cut yerba with stems",
            "GRC-001",
            dec!(6.40),
            120,
            "grocery",
        ),
        sample_product(
            "Dulce de Leche",
            "Classic style, 400g jar",
            "GRC-002",
            dec!(3.25),
            80,
            "grocery",
        ),
        sample_product(
            "Alfajores Box",
            "Twelve chocolate covered alfajores",
            "GRC-003",
            dec!(9.90),
            40,
            "grocery",
        ),
        sample_product(
            "Mate Gourd",
            "Hand-carved calabash gourd",
            "KIT-001",
            dec!(12.50),
            25,
            "kitchen",
        ),
        sample_product(
            "Steel Bombilla",
            "Stainless steel filter straw",
            "KIT-002",
            dec!(7.00),
            60,
            "kitchen",
        ),
        sample_product(
            "Thermos 1L",
            "Double wall steel thermos",
            "KIT-003",
            dec!(34.90),
            15,
            "kitchen",
        ),
        sample_product(
            "Wool Poncho",
            "Handwoven sheep wool poncho",
            "APP-001",
            dec!(89.00),
            8,
            "apparel",
        ),
        sample_product(
            "Leather Boots",
            "Riding boots in natural leather",
            "APP-002",
            dec!(120.00),
            5,
            "apparel",
        ),
        sample_product(
            "Canvas Alpargatas",
            "Rope-soled canvas shoes",
            "APP-003",
            dec!(18.75),
            0,
            "apparel",
        ),
    ]
}
