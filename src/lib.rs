#![recursion_limit = "256"]

pub mod config;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod services;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

pub use config::{Config, ConfigError};
pub use observability::{init_observability, shutdown_observability, Metrics};

use handlers::{
    admin, api, cart, cors_middleware, health_check, metrics_handler,
    request_validation_middleware, security_headers_middleware, AdminState, ApiState,
};
use observability::{observability_middleware, BusinessTracingMiddleware};
use repositories::TableManager;
use services::{CartService, CatalogService};

/// Everything the router needs, built once at startup
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub metrics: Arc<Metrics>,
    pub catalog_service: Arc<CatalogService>,
    pub cart_service: Arc<CartService>,
    pub table_manager: Arc<TableManager>,
}

/// Build the application router with all routes and middleware
pub fn create_app(context: AppContext) -> Router {
    let AppContext {
        config,
        metrics,
        catalog_service,
        cart_service,
        table_manager,
    } = context;

    let business = BusinessTracingMiddleware::new(metrics.clone());

    let api_state = ApiState {
        catalog_service: catalog_service.clone(),
        cart_service,
        business: business.clone(),
        default_cart_id: config.store.default_cart_id.clone(),
        default_page_size: config.store.default_page_size,
    };

    let admin_state = AdminState {
        catalog_service,
        table_manager,
        business,
        products_table_name: config.database.products_table_name.clone(),
        carts_table_name: config.database.carts_table_name.clone(),
    };

    let probes = Router::new()
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics.clone());

    let storefront = Router::new()
        .route("/api/products", get(api::list_products))
        .route("/api/products/:product_id", get(api::get_product))
        .route("/api/carts", post(cart::create_cart))
        .route(
            "/api/carts/:cart_id",
            get(cart::get_cart)
                .put(cart::replace_cart)
                .delete(cart::empty_cart),
        )
        .route(
            "/api/carts/:cart_id/products/:product_id",
            post(cart::add_product)
                .put(cart::set_quantity)
                .delete(cart::remove_product),
        )
        .route(
            "/api/cart",
            get(cart::get_default_cart).delete(cart::empty_default_cart),
        )
        .route(
            "/api/cart/products/:product_id",
            post(cart::add_to_default_cart).delete(cart::remove_from_default_cart),
        )
        .with_state(api_state);

    let admin = Router::new()
        .route("/api/admin/setup-tables", post(admin::setup_tables))
        .route("/api/admin/seed", post(admin::seed_database))
        .route("/api/admin/products", post(admin::create_product))
        .route(
            "/api/admin/products/:product_id",
            put(admin::update_product).delete(admin::delete_product),
        )
        .with_state(admin_state);

    let max_request_size = config.server.max_request_size;

    // layers run outermost-last
    Router::new()
        .merge(probes)
        .merge(storefront)
        .merge(admin)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(cors_middleware))
        .layer(middleware::from_fn(move |req, next| {
            request_validation_middleware(max_request_size, req, next)
        }))
        .layer(RequestBodyLimitLayer::new(max_request_size))
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics.clone(), req, next)
        }))
}
