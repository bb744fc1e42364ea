#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use uuid::Uuid;

use storefront_rs::models::{
    Cart, CreateProductRequest, Product, ProductFilter, ProductStatus, RepositoryError,
    RepositoryResult, SortOrder, UpdateProductRequest,
};
use storefront_rs::repositories::{CartRepository, ProductRepository, TableManager};
use storefront_rs::services::{CartService, CatalogService};
use storefront_rs::{create_app, AppContext, Config, Metrics};

/// Product store backed by a map, ordered the same way as the DynamoDB scan path
#[derive(Default)]
pub struct InMemoryProductRepository {
    products: Mutex<HashMap<Uuid, Product>>,
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Product>> {
        Ok(self.products.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<Vec<Product>> {
        let products = self.products.lock().unwrap();
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn find_page(
        &self,
        filter: &ProductFilter,
        sort: SortOrder,
        skip: usize,
        limit: usize,
    ) -> RepositoryResult<(Vec<Product>, usize)> {
        let mut matching: Vec<Product> = self
            .products
            .lock()
            .unwrap()
            .values()
            .filter(|product| filter.matches(product))
            .cloned()
            .collect();
        sort.sort(&mut matching);

        let total = matching.len();
        let page = matching.into_iter().skip(skip).take(limit).collect();
        Ok((page, total))
    }

    async fn insert(&self, product: Product) -> RepositoryResult<Product> {
        let mut products = self.products.lock().unwrap();
        if products.contains_key(&product.id) {
            return Err(RepositoryError::AwsSdk {
                message: format!("Product {} already exists", product.id),
            });
        }
        products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_by_id(
        &self,
        id: Uuid,
        patch: UpdateProductRequest,
    ) -> RepositoryResult<Option<Product>> {
        let mut products = self.products.lock().unwrap();
        Ok(products.get_mut(&id).map(|product| {
            product.apply(patch);
            product.clone()
        }))
    }

    async fn delete_by_id(&self, id: Uuid) -> RepositoryResult<Option<Product>> {
        Ok(self.products.lock().unwrap().remove(&id))
    }
}

#[derive(Default)]
pub struct InMemoryCartRepository {
    carts: Mutex<HashMap<Uuid, Cart>>,
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Cart>> {
        Ok(self.carts.lock().unwrap().get(&id).cloned())
    }

    async fn insert(&self, cart: Cart) -> RepositoryResult<Cart> {
        self.carts.lock().unwrap().insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn save(&self, cart: &Cart) -> RepositoryResult<()> {
        self.carts.lock().unwrap().insert(cart.id, cart.clone());
        Ok(())
    }
}

/// Client that never reaches AWS; only used so the admin routes can be mounted
pub fn offline_dynamodb_client() -> Arc<aws_sdk_dynamodb::Client> {
    let config = aws_sdk_dynamodb::Config::builder()
        .region(aws_sdk_dynamodb::config::Region::new("us-east-1"))
        .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
        .build();
    Arc::new(aws_sdk_dynamodb::Client::from_conf(config))
}

pub fn product_request(
    title: &str,
    price: rust_decimal::Decimal,
    stock: u32,
    category: &str,
) -> CreateProductRequest {
    CreateProductRequest {
        title: title.to_string(),
        description: format!("{} for tests", title),
        code: title.to_uppercase().replace(' ', "-"),
        price,
        stock,
        category: category.to_string(),
        status: ProductStatus::Active,
    }
}

/// The real router over in-memory repositories
pub struct TestApp {
    pub products: Arc<InMemoryProductRepository>,
    pub carts: Arc<InMemoryCartRepository>,
    pub router: axum::Router,
}

impl TestApp {
    pub fn new(config: Config) -> Self {
        let products = Arc::new(InMemoryProductRepository::default());
        let carts = Arc::new(InMemoryCartRepository::default());

        let router = create_app(AppContext {
            config,
            metrics: Arc::new(Metrics::new().expect("metrics")),
            catalog_service: Arc::new(CatalogService::new(products.clone())),
            cart_service: Arc::new(CartService::new(carts.clone(), products.clone())),
            table_manager: Arc::new(TableManager::new(offline_dynamodb_client())),
        });

        Self {
            products,
            carts,
            router,
        }
    }

    pub async fn add_product(&self, request: CreateProductRequest) -> Product {
        self.products
            .insert(Product::new(request))
            .await
            .expect("insert product")
    }

    pub async fn add_cart(&self, cart: Cart) -> Cart {
        self.carts.insert(cart).await.expect("insert cart")
    }
}

pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
    pub app: TestApp,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let app = TestApp::new(config);
        let router = app.router.clone();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Failed to serve app");
        });

        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            client: Client::new(),
            base_url,
            app,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
