use aws_config::BehaviorVersion;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use storefront_rs::{
    create_app, init_observability,
    observability::Metrics,
    repositories::{DynamoDbCartRepository, DynamoDbProductRepository, TableManager},
    services::{CartService, CatalogService},
    shutdown_observability, AppContext, Config,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_environment()?;

    init_observability(&config.observability)?;

    info!(
        "Starting {} v{}",
        config.observability.service_name, config.observability.service_version
    );
    info!(
        "DynamoDB tables: products={}, carts={} in {}",
        config.database.products_table_name,
        config.database.carts_table_name,
        config.database.region
    );

    let metrics = Arc::new(Metrics::new()?);

    let dynamodb_client = Arc::new(create_dynamodb_client(&config).await);

    let table_manager = Arc::new(TableManager::new(dynamodb_client.clone()));

    let product_repository = Arc::new(DynamoDbProductRepository::new(
        dynamodb_client.clone(),
        config.database.products_table_name.clone(),
        config.database.region.clone(),
    ));
    let cart_repository = Arc::new(DynamoDbCartRepository::new(
        dynamodb_client,
        config.database.carts_table_name.clone(),
        config.database.region.clone(),
    ));

    let catalog_service = Arc::new(CatalogService::new(product_repository.clone()));
    let cart_service = Arc::new(CartService::new(cart_repository, product_repository));
    info!("Services initialized successfully");

    if config.store.default_cart_id.is_none() {
        warn!("No default cart configured, /api/cart will return 404");
    }

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let app = create_app(AppContext {
        config,
        metrics,
        catalog_service,
        cart_service,
        table_manager,
    });

    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn create_dynamodb_client(config: &Config) -> aws_sdk_dynamodb::Client {
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(config.database.region.clone()))
        .load()
        .await;

    let mut builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);
    if let Some(endpoint_url) = &config.database.endpoint_url {
        info!("Using DynamoDB endpoint override: {}", endpoint_url);
        builder = builder.endpoint_url(endpoint_url);
    }

    aws_sdk_dynamodb::Client::from_conf(builder.build())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
    shutdown_observability().await;
}
