use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::{parse_id, parse_quantity, Product, ServiceError, ServiceResult};

/// Shopping cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub products: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One product reference held by a cart. At most one line exists per product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Uuid,
    pub quantity: u32,
}

/// Read view of a cart with product references resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCart {
    pub id: Uuid,
    pub products: Vec<ResolvedCartLine>,
    pub total_items: u64,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line whose product may have been deleted since it was added
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCartLine {
    pub product_id: Uuid,
    pub product: Option<Product>,
    pub quantity: u32,
}

/// Quantity as sent by clients: a JSON integer or a string holding one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawQuantity(pub serde_json::Value);

/// Request body for adding a product to a cart
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddToCartRequest {
    #[serde(default)]
    pub quantity: Option<RawQuantity>,
}

/// Request body for setting the quantity of a cart line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: RawQuantity,
}

/// Request body for replacing every line of a cart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceCartRequest {
    pub products: Vec<CartLineInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineInput {
    pub product: String,
    pub quantity: RawQuantity,
}

/// A validated line requested by a client, not yet checked against stock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedLine {
    pub product_id: Uuid,
    pub quantity: u64,
}

impl Cart {
    /// Create a new empty cart
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            products: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add `quantity` units of `product`, merging into an existing line.
    /// Returns the resulting line quantity. On error the cart is unchanged.
    pub fn add_line(&mut self, product: &Product, quantity: u64) -> ServiceResult<u32> {
        if quantity == 0 {
            return Err(ServiceError::InvalidQuantity {
                value: quantity.to_string(),
            });
        }
        ensure_stock(product, quantity)?;

        let new_quantity = match self.line(product.id) {
            Some(line) => {
                let merged = u64::from(line.quantity) + quantity;
                ensure_stock(product, merged)?;
                merged
            }
            None => quantity,
        };

        // bounded by stock, which is a u32
        let new_quantity = new_quantity as u32;
        match self.products.iter_mut().find(|line| line.product == product.id) {
            Some(line) => line.quantity = new_quantity,
            None => self.products.push(CartLine {
                product: product.id,
                quantity: new_quantity,
            }),
        }
        self.updated_at = Utc::now();

        Ok(new_quantity)
    }

    /// Overwrite the quantity of an existing line
    pub fn set_line_quantity(&mut self, product: &Product, quantity: u64) -> ServiceResult<()> {
        if quantity == 0 {
            return Err(ServiceError::InvalidQuantity {
                value: quantity.to_string(),
            });
        }
        let cart_id = self.id;
        let line = self
            .products
            .iter_mut()
            .find(|line| line.product == product.id)
            .ok_or_else(|| ServiceError::CartLineNotFound {
                cart_id: cart_id.to_string(),
                product_id: product.id.to_string(),
            })?;

        ensure_stock(product, quantity)?;
        line.quantity = quantity as u32;
        self.updated_at = Utc::now();

        Ok(())
    }

    /// Remove the line for a product. Returns false if there was none.
    pub fn remove_line(&mut self, product_id: Uuid) -> bool {
        let original_len = self.products.len();
        self.products.retain(|line| line.product != product_id);
        let removed = self.products.len() != original_len;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Replace every line. Callers are responsible for validating the lines.
    pub fn replace_lines(&mut self, lines: Vec<CartLine>) {
        self.products = lines;
        self.updated_at = Utc::now();
    }

    pub fn clear(&mut self) {
        self.products.clear();
        self.updated_at = Utc::now();
    }

    pub fn line(&self, product_id: Uuid) -> Option<&CartLine> {
        self.products.iter().find(|line| line.product == product_id)
    }

    pub fn contains(&self, product_id: Uuid) -> bool {
        self.line(product_id).is_some()
    }

    pub fn quantity_of(&self, product_id: Uuid) -> u32 {
        self.line(product_id).map(|line| line.quantity).unwrap_or(0)
    }

    pub fn total_items(&self) -> u64 {
        self.products
            .iter()
            .map(|line| u64::from(line.quantity))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Distinct product ids referenced by the cart, in line order
    pub fn product_ids(&self) -> Vec<Uuid> {
        self.products.iter().map(|line| line.product).collect()
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolvedCart {
    /// Join a cart with whichever of its products still exist
    pub fn resolve(cart: Cart, products: Vec<Product>) -> Self {
        let mut by_id: HashMap<Uuid, Product> =
            products.into_iter().map(|p| (p.id, p)).collect();

        let lines: Vec<ResolvedCartLine> = cart
            .products
            .into_iter()
            .map(|line| ResolvedCartLine {
                product_id: line.product,
                product: by_id.remove(&line.product),
                quantity: line.quantity,
            })
            .collect();

        let total_items = lines.iter().map(|line| u64::from(line.quantity)).sum();
        let total_price = lines.iter().map(ResolvedCartLine::total_price).sum();

        Self {
            id: cart.id,
            products: lines,
            total_items,
            total_price,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        }
    }
}

impl ResolvedCartLine {
    /// Line total; zero when the product no longer exists
    pub fn total_price(&self) -> Decimal {
        self.product
            .as_ref()
            .map(|product| product.price * Decimal::from(self.quantity))
            .unwrap_or(Decimal::ZERO)
    }
}

impl RawQuantity {
    pub fn resolve(&self) -> ServiceResult<u64> {
        parse_quantity(&self.0)
    }
}

impl AddToCartRequest {
    /// Requested quantity; a missing quantity adds a single unit
    pub fn quantity(&self) -> ServiceResult<u64> {
        match &self.quantity {
            Some(raw) => raw.resolve(),
            None => Ok(1),
        }
    }
}

impl CartLineInput {
    pub fn parse(&self) -> ServiceResult<RequestedLine> {
        let product_id = parse_id("product", &self.product)?;
        let quantity = self.quantity.resolve()?;
        Ok(RequestedLine {
            product_id,
            quantity,
        })
    }
}

impl ReplaceCartRequest {
    pub fn parse(&self) -> ServiceResult<Vec<RequestedLine>> {
        self.products.iter().map(CartLineInput::parse).collect()
    }
}

fn ensure_stock(product: &Product, quantity: u64) -> ServiceResult<()> {
    if product.can_supply(quantity) {
        Ok(())
    } else {
        Err(ServiceError::StockExceeded {
            product_id: product.id.to_string(),
            requested: quantity,
            available: product.stock,
        })
    }
}
