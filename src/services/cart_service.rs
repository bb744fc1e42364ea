use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::models::{
    parse_id, Cart, CartLine, Product, RequestedLine, ResolvedCart, ServiceError, ServiceResult,
};
use crate::repositories::{CartRepository, ProductRepository};

/// Service for managing shopping carts
pub struct CartService {
    cart_repository: Arc<dyn CartRepository>,
    product_repository: Arc<dyn ProductRepository>,
}

impl CartService {
    pub fn new(
        cart_repository: Arc<dyn CartRepository>,
        product_repository: Arc<dyn ProductRepository>,
    ) -> Self {
        Self {
            cart_repository,
            product_repository,
        }
    }

    /// Create and persist a new empty cart
    #[instrument(skip(self))]
    pub async fn create_cart(&self) -> ServiceResult<Cart> {
        let cart = self.cart_repository.insert(Cart::new()).await?;
        crate::info_with_trace!(cart_id = %cart.id, "Cart created");
        Ok(cart)
    }

    /// Fetch a cart with its product references resolved in one batched lookup.
    /// Lines whose product has since been deleted come back with no product.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn get_cart(&self, cart_id: &str) -> ServiceResult<ResolvedCart> {
        crate::info_with_trace!("Getting cart");

        let cart = self.load_cart(cart_id).await?;
        let products = if cart.is_empty() {
            Vec::new()
        } else {
            self.product_repository
                .find_by_ids(&cart.product_ids())
                .await?
        };

        let resolved = ResolvedCart::resolve(cart, products);

        let dangling = resolved
            .products
            .iter()
            .filter(|line| line.product.is_none())
            .count();
        if dangling > 0 {
            crate::warn_with_trace!("Cart references {} deleted products", dangling);
        }

        crate::info_with_trace!("Cart retrieved with {} lines", resolved.products.len());
        Ok(resolved)
    }

    /// Add `quantity` units of a product, merging with an existing line
    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id, quantity))]
    pub async fn add_product(
        &self,
        cart_id: &str,
        product_id: &str,
        quantity: u64,
    ) -> ServiceResult<Cart> {
        crate::info_with_trace!("Adding product to cart");

        if quantity == 0 {
            return Err(ServiceError::InvalidQuantity {
                value: quantity.to_string(),
            });
        }

        let mut cart = self.load_cart(cart_id).await?;
        let product = self.load_product(product_id).await?;

        let line_quantity = cart.add_line(&product, quantity).inspect_err(|e| {
            crate::warn_with_trace!("Rejected add to cart: {}", e);
        })?;

        self.cart_repository.save(&cart).await?;

        crate::info_with_trace!("Product added to cart, line quantity now {}", line_quantity);
        Ok(cart)
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn remove_product(&self, cart_id: &str, product_id: &str) -> ServiceResult<Cart> {
        crate::info_with_trace!("Removing product from cart");

        let product_uuid = parse_id("product_id", product_id)?;
        let mut cart = self.load_cart(cart_id).await?;

        if !cart.remove_line(product_uuid) {
            return Err(ServiceError::CartLineNotFound {
                cart_id: cart_id.to_string(),
                product_id: product_id.to_string(),
            });
        }

        self.cart_repository.save(&cart).await?;

        crate::info_with_trace!("Product removed from cart");
        Ok(cart)
    }

    /// Overwrite the quantity of an existing line, re-checking stock
    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id, quantity))]
    pub async fn set_quantity(
        &self,
        cart_id: &str,
        product_id: &str,
        quantity: u64,
    ) -> ServiceResult<Cart> {
        crate::info_with_trace!("Updating cart line quantity");

        if quantity == 0 {
            return Err(ServiceError::InvalidQuantity {
                value: quantity.to_string(),
            });
        }

        let product_uuid = parse_id("product_id", product_id)?;
        let mut cart = self.load_cart(cart_id).await?;

        if !cart.contains(product_uuid) {
            return Err(ServiceError::CartLineNotFound {
                cart_id: cart_id.to_string(),
                product_id: product_id.to_string(),
            });
        }

        let product = self.load_product(product_id).await?;
        cart.set_line_quantity(&product, quantity)?;

        self.cart_repository.save(&cart).await?;

        crate::info_with_trace!("Cart line quantity updated");
        Ok(cart)
    }

    /// Replace every line of the cart. Each line is validated as if it were
    /// being added; nothing is persisted unless every line passes.
    #[instrument(skip(self, lines), fields(cart_id = %cart_id, line_count = lines.len()))]
    pub async fn replace_lines(
        &self,
        cart_id: &str,
        lines: Vec<RequestedLine>,
    ) -> ServiceResult<Cart> {
        crate::info_with_trace!("Replacing cart lines");

        let mut seen = HashSet::new();
        for line in &lines {
            if line.quantity == 0 {
                return Err(ServiceError::InvalidQuantity {
                    value: line.quantity.to_string(),
                });
            }
            if !seen.insert(line.product_id) {
                return Err(ServiceError::ValidationError {
                    message: format!("Duplicate product in cart lines: {}", line.product_id),
                });
            }
        }

        let mut cart = self.load_cart(cart_id).await?;

        let ids: Vec<Uuid> = lines.iter().map(|line| line.product_id).collect();
        let products: HashMap<Uuid, Product> = if ids.is_empty() {
            HashMap::new()
        } else {
            self.product_repository
                .find_by_ids(&ids)
                .await?
                .into_iter()
                .map(|product| (product.id, product))
                .collect()
        };

        let mut validated = Vec::with_capacity(lines.len());
        for line in lines {
            let product =
                products
                    .get(&line.product_id)
                    .ok_or_else(|| ServiceError::ProductNotFound {
                        id: line.product_id.to_string(),
                    })?;

            if !product.can_supply(line.quantity) {
                return Err(ServiceError::StockExceeded {
                    product_id: product.id.to_string(),
                    requested: line.quantity,
                    available: product.stock,
                });
            }

            validated.push(CartLine {
                product: product.id,
                quantity: line.quantity as u32,
            });
        }

        cart.replace_lines(validated);
        self.cart_repository.save(&cart).await?;

        crate::info_with_trace!("Cart lines replaced, {} lines", cart.products.len());
        Ok(cart)
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn empty_cart(&self, cart_id: &str) -> ServiceResult<Cart> {
        crate::info_with_trace!("Emptying cart");

        let mut cart = self.load_cart(cart_id).await?;
        cart.clear();
        self.cart_repository.save(&cart).await?;

        crate::info_with_trace!("Cart emptied");
        Ok(cart)
    }

    async fn load_cart(&self, cart_id: &str) -> ServiceResult<Cart> {
        let id = parse_id("cart_id", cart_id)?;
        self.cart_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::CartNotFound {
                id: cart_id.to_string(),
            })
    }

    async fn load_product(&self, product_id: &str) -> ServiceResult<Product> {
        let id = parse_id("product_id", product_id)?;
        self.product_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::ProductNotFound {
                id: product_id.to_string(),
            })
    }
}
