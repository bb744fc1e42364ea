use async_trait::async_trait;
use aws_sdk_dynamodb::operation::RequestId;
use aws_sdk_dynamodb::types::{AttributeValue, KeysAndAttributes, ReturnValue};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument, warn, Instrument};
use uuid::Uuid;

use super::dynamodb::{
    dynamodb_span, get_decimal, get_number, get_string, get_timestamp, get_uuid, id_key,
    map_dynamodb_error, Item,
};
use crate::models::{
    Product, ProductFilter, ProductStatus, RepositoryError, RepositoryResult, SortOrder,
    UpdateProductRequest,
};

/// BatchGetItem accepts at most this many keys per request
const BATCH_GET_LIMIT: usize = 100;

/// Trait defining the interface for product data access operations
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Find a product by its ID
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Product>>;

    /// Find every product among `ids` that exists; unknown ids are skipped
    async fn find_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<Vec<Product>>;

    /// One page of matching products plus the total number of matches
    async fn find_page(
        &self,
        filter: &ProductFilter,
        sort: SortOrder,
        skip: usize,
        limit: usize,
    ) -> RepositoryResult<(Vec<Product>, usize)>;

    async fn insert(&self, product: Product) -> RepositoryResult<Product>;

    /// Apply a patch; `None` when the product does not exist
    async fn update_by_id(
        &self,
        id: Uuid,
        patch: UpdateProductRequest,
    ) -> RepositoryResult<Option<Product>>;

    /// Hard delete, returning the removed product
    async fn delete_by_id(&self, id: Uuid) -> RepositoryResult<Option<Product>>;
}

/// DynamoDB implementation of the ProductRepository trait
pub struct DynamoDbProductRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbProductRepository {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
            region,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn span(&self, operation: &str) -> tracing::Span {
        dynamodb_span(&self.table_name, &self.region, operation)
    }

    fn map_error(&self, error: aws_sdk_dynamodb::Error) -> RepositoryError {
        map_dynamodb_error(&self.table_name, error)
    }

    /// Convert a Product struct to DynamoDB attribute values
    pub fn product_to_item(&self, product: &Product) -> Item {
        let mut item = HashMap::new();

        item.insert("id".to_string(), id_key(product.id));
        item.insert("title".to_string(), AttributeValue::S(product.title.clone()));
        item.insert(
            "description".to_string(),
            AttributeValue::S(product.description.clone()),
        );
        item.insert("code".to_string(), AttributeValue::S(product.code.clone()));
        item.insert(
            "price".to_string(),
            AttributeValue::N(product.price.to_string()),
        );
        item.insert(
            "stock".to_string(),
            AttributeValue::N(product.stock.to_string()),
        );
        item.insert(
            "category".to_string(),
            AttributeValue::S(product.category.clone()),
        );
        item.insert(
            "status".to_string(),
            AttributeValue::Bool(product.status.into()),
        );
        item.insert(
            "created_at".to_string(),
            AttributeValue::S(product.created_at.to_rfc3339()),
        );
        item.insert(
            "updated_at".to_string(),
            AttributeValue::S(product.updated_at.to_rfc3339()),
        );

        item
    }

    /// Convert DynamoDB item to Product struct
    pub fn item_to_product(&self, item: &Item) -> RepositoryResult<Product> {
        let created_at = get_timestamp(item, "created_at")?;
        // Items written before updated_at existed fall back to created_at
        let updated_at = get_timestamp(item, "updated_at").unwrap_or(created_at);

        let status = item
            .get("status")
            .and_then(|v| v.as_bool().ok())
            .copied()
            .map(ProductStatus::from)
            .unwrap_or_default();

        Ok(Product {
            id: get_uuid(item, "id")?,
            title: get_string(item, "title")?,
            description: get_string(item, "description").unwrap_or_default(),
            code: get_string(item, "code")?,
            price: get_decimal(item, "price")?,
            stock: get_number(item, "stock")?,
            category: get_string(item, "category")?,
            status,
            created_at,
            updated_at,
        })
    }

    /// Parse items, skipping (and logging) any that are malformed
    fn parse_items(&self, items: Vec<Item>) -> Vec<Product> {
        items
            .iter()
            .filter_map(|item| match self.item_to_product(item) {
                Ok(product) => Some(product),
                Err(e) => {
                    warn!("Failed to parse product item: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Scan the whole table with the filter pushed down into DynamoDB
    async fn scan_matching(&self, filter: &ProductFilter) -> RepositoryResult<Vec<Product>> {
        let mut filter_expressions = Vec::new();
        let mut expression_attribute_values = HashMap::new();
        let mut expression_attribute_names = HashMap::new();

        if let Some(category) = &filter.category {
            filter_expressions.push("#category = :category".to_string());
            expression_attribute_names.insert("#category".to_string(), "category".to_string());
            expression_attribute_values
                .insert(":category".to_string(), AttributeValue::S(category.clone()));
        }

        if let Some(min_price) = filter.min_price {
            filter_expressions.push("price >= :min_price".to_string());
            expression_attribute_values.insert(
                ":min_price".to_string(),
                AttributeValue::N(min_price.to_string()),
            );
        }

        if let Some(max_price) = filter.max_price {
            filter_expressions.push("price <= :max_price".to_string());
            expression_attribute_values.insert(
                ":max_price".to_string(),
                AttributeValue::N(max_price.to_string()),
            );
        }

        let filter_expression =
            (!filter_expressions.is_empty()).then(|| filter_expressions.join(" AND "));
        let names = (!expression_attribute_names.is_empty()).then_some(expression_attribute_names);
        let values =
            (!expression_attribute_values.is_empty()).then_some(expression_attribute_values);

        let mut products = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let response = async {
                self.client
                    .scan()
                    .table_name(&self.table_name)
                    .set_filter_expression(filter_expression.clone())
                    .set_expression_attribute_names(names.clone())
                    .set_expression_attribute_values(values.clone())
                    .set_exclusive_start_key(start_key.take())
                    .send()
                    .await
                    .map_err(|e| self.map_error(e.into()))
            }
            .instrument(self.span("Scan"))
            .await?;

            products.extend(self.parse_items(response.items.unwrap_or_default()));

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(products)
    }
}

#[async_trait]
impl ProductRepository for DynamoDbProductRepository {
    #[instrument(skip(self), fields(table = %self.table_name, id = %id))]
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Product>> {
        info!("Finding product by ID");

        let response = async {
            let result = self
                .client
                .get_item()
                .table_name(&self.table_name)
                .key("id", id_key(id))
                .send()
                .await;

            match &result {
                Ok(output) => {
                    if let Some(request_id) = output.request_id() {
                        tracing::Span::current().record("aws.request_id", request_id);
                    }
                }
                Err(e) => error!("DynamoDB GetItem failed: {}", e),
            }

            result.map_err(|e| self.map_error(e.into()))
        }
        .instrument(self.span("GetItem"))
        .await?;

        match response.item {
            Some(item) => {
                let product = self.item_to_product(&item)?;
                info!("Product found");
                Ok(Some(product))
            }
            None => {
                info!("Product not found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, ids), fields(table = %self.table_name, requested = ids.len()))]
    async fn find_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<Vec<Product>> {
        let mut seen = HashSet::new();
        let unique: Vec<Uuid> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let mut products = Vec::with_capacity(unique.len());

        for chunk in unique.chunks(BATCH_GET_LIMIT) {
            let keys: Vec<Item> = chunk
                .iter()
                .map(|id| HashMap::from([("id".to_string(), id_key(*id))]))
                .collect();

            let mut pending = Some(
                KeysAndAttributes::builder()
                    .set_keys(Some(keys))
                    .build()
                    .map_err(|e| RepositoryError::AwsSdk {
                        message: e.to_string(),
                    })?,
            );

            while let Some(request) = pending.take() {
                let response = async {
                    self.client
                        .batch_get_item()
                        .request_items(&self.table_name, request)
                        .send()
                        .await
                        .map_err(|e| self.map_error(e.into()))
                }
                .instrument(self.span("BatchGetItem"))
                .await?;

                if let Some(mut responses) = response.responses {
                    if let Some(items) = responses.remove(&self.table_name) {
                        products.extend(self.parse_items(items));
                    }
                }

                pending = response
                    .unprocessed_keys
                    .and_then(|mut unprocessed| unprocessed.remove(&self.table_name))
                    .filter(|request| !request.keys().is_empty());
            }
        }

        info!("Resolved {} of {} products", products.len(), unique.len());
        Ok(products)
    }

    #[instrument(skip(self, filter), fields(table = %self.table_name))]
    async fn find_page(
        &self,
        filter: &ProductFilter,
        sort: SortOrder,
        skip: usize,
        limit: usize,
    ) -> RepositoryResult<(Vec<Product>, usize)> {
        info!("Finding product page");

        let mut products = self.scan_matching(filter).await?;
        let total = products.len();

        sort.sort(&mut products);
        let page: Vec<Product> = products.into_iter().skip(skip).take(limit).collect();

        info!("Found {} products, returning {}", total, page.len());
        Ok((page, total))
    }

    #[instrument(skip(self, product), fields(table = %self.table_name, id = %product.id))]
    async fn insert(&self, product: Product) -> RepositoryResult<Product> {
        info!("Creating new product");

        let item = self.product_to_item(&product);

        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression("attribute_not_exists(id)")
                .send()
                .await
                .map_err(|e| self.map_error(e.into()))
        }
        .instrument(self.span("PutItem"))
        .await?;

        info!("Product created successfully");
        Ok(product)
    }

    #[instrument(skip(self, patch), fields(table = %self.table_name, id = %id))]
    async fn update_by_id(
        &self,
        id: Uuid,
        patch: UpdateProductRequest,
    ) -> RepositoryResult<Option<Product>> {
        info!("Updating product");

        let mut product = match self.find_by_id(id).await? {
            Some(product) => product,
            None => return Ok(None),
        };
        product.apply(patch);

        let item = self.product_to_item(&product);

        let result = async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression("attribute_exists(id)")
                .send()
                .await
        }
        .instrument(self.span("PutItem"))
        .await;

        match result {
            Ok(_) => {
                info!("Product updated successfully");
                Ok(Some(product))
            }
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_conditional_check_failed_exception())
                    .unwrap_or(false) =>
            {
                warn!("Product deleted while being updated");
                Ok(None)
            }
            Err(e) => Err(self.map_error(e.into())),
        }
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = %id))]
    async fn delete_by_id(&self, id: Uuid) -> RepositoryResult<Option<Product>> {
        info!("Deleting product");

        let response = async {
            self.client
                .delete_item()
                .table_name(&self.table_name)
                .key("id", id_key(id))
                .return_values(ReturnValue::AllOld)
                .send()
                .await
                .map_err(|e| self.map_error(e.into()))
        }
        .instrument(self.span("DeleteItem"))
        .await?;

        match response.attributes {
            Some(item) if !item.is_empty() => {
                info!("Product deleted successfully");
                Ok(Some(self.item_to_product(&item)?))
            }
            _ => {
                info!("Product not found");
                Ok(None)
            }
        }
    }
}
