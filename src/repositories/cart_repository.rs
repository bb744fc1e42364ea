use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, Instrument};
use uuid::Uuid;

use super::dynamodb::{
    dynamodb_span, get_number, get_timestamp, get_uuid, id_key, map_dynamodb_error, Item,
};
use crate::models::{Cart, CartLine, RepositoryError, RepositoryResult};

/// Trait defining the interface for cart data access operations
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Find a cart by its ID
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Cart>>;

    /// Persist a new cart
    async fn insert(&self, cart: Cart) -> RepositoryResult<Cart>;

    /// Overwrite a cart with its current state
    async fn save(&self, cart: &Cart) -> RepositoryResult<()>;
}

/// DynamoDB implementation of the CartRepository trait
pub struct DynamoDbCartRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbCartRepository {
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

    /// Convert a Cart struct to DynamoDB attribute values
    pub fn cart_to_item(&self, cart: &Cart) -> Item {
        let mut item = HashMap::new();

        item.insert("id".to_string(), id_key(cart.id));

        let lines: Vec<AttributeValue> = cart
            .products
            .iter()
            .map(|line| {
                AttributeValue::M(HashMap::from([
                    ("product_id".to_string(), id_key(line.product)),
                    (
                        "quantity".to_string(),
                        AttributeValue::N(line.quantity.to_string()),
                    ),
                ]))
            })
            .collect();

        item.insert("products".to_string(), AttributeValue::L(lines));
        item.insert(
            "created_at".to_string(),
            AttributeValue::S(cart.created_at.to_rfc3339()),
        );
        item.insert(
            "updated_at".to_string(),
            AttributeValue::S(cart.updated_at.to_rfc3339()),
        );

        item
    }

    /// Convert DynamoDB item to Cart struct
    pub fn item_to_cart(&self, item: &Item) -> RepositoryResult<Cart> {
        let id = get_uuid(item, "id")?;

        let products = match item.get("products") {
            Some(value) => value
                .as_l()
                .map_err(|_| RepositoryError::InvalidItem {
                    message: "products must be a list".to_string(),
                })?
                .iter()
                .map(|line| self.map_to_cart_line(line))
                .collect::<RepositoryResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        let created_at = get_timestamp(item, "created_at")?;
        let updated_at = get_timestamp(item, "updated_at").unwrap_or(created_at);

        Ok(Cart {
            id,
            products,
            created_at,
            updated_at,
        })
    }

    /// Convert one element of the `products` list to a CartLine
    pub fn map_to_cart_line(&self, value: &AttributeValue) -> RepositoryResult<CartLine> {
        let line = value.as_m().map_err(|_| RepositoryError::InvalidItem {
            message: "cart line must be a map".to_string(),
        })?;

        Ok(CartLine {
            product: get_uuid(line, "product_id")?,
            quantity: get_number(line, "quantity")?,
        })
    }

    async fn put(&self, cart: &Cart, condition: Option<&str>) -> RepositoryResult<()> {
        let item = self.cart_to_item(cart);

        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .set_condition_expression(condition.map(str::to_string))
                .send()
                .await
                .map_err(|e| map_dynamodb_error(&self.table_name, e.into()))
        }
        .instrument(self.span("PutItem"))
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CartRepository for DynamoDbCartRepository {
    #[instrument(skip(self), fields(table = %self.table_name, cart_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Cart>> {
        info!("Finding cart");

        let response = async {
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("id", id_key(id))
                .send()
                .await
                .map_err(|e| map_dynamodb_error(&self.table_name, e.into()))
        }
        .instrument(self.span("GetItem"))
        .await?;

        match response.item {
            Some(item) => {
                let cart = self.item_to_cart(&item)?;
                info!("Cart found with {} lines", cart.products.len());
                Ok(Some(cart))
            }
            None => {
                info!("Cart not found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, cart), fields(table = %self.table_name, cart_id = %cart.id))]
    async fn insert(&self, cart: Cart) -> RepositoryResult<Cart> {
        info!("Creating cart");
        self.put(&cart, Some("attribute_not_exists(id)")).await?;
        info!("Cart created successfully");
        Ok(cart)
    }

    #[instrument(skip(self, cart), fields(table = %self.table_name, cart_id = %cart.id, line_count = cart.products.len()))]
    async fn save(&self, cart: &Cart) -> RepositoryResult<()> {
        info!("Saving cart");
        // last write wins
        self.put(cart, None).await?;
        info!("Cart saved successfully");
        Ok(())
    }
}
