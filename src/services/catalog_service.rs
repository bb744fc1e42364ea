use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    parse_id, CreateProductRequest, Product, ProductPage, ProductQuery, ServiceError,
    ServiceResult, UpdateProductRequest, Validate,
};
use crate::repositories::ProductRepository;

/// Service for browsing and managing the product catalog
pub struct CatalogService {
    repository: Arc<dyn ProductRepository>,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn ProductRepository>) -> Self {
        Self { repository }
    }

    /// List one page of products matching the query
    #[instrument(skip(self), fields(page = query.page, limit = query.limit, sort = %query.sort))]
    pub async fn list_products(&self, query: ProductQuery) -> ServiceResult<ProductPage> {
        crate::info_with_trace!("Listing products");

        query.filter.validate()?;
        let query = query.normalize();

        let (items, total_items) = self
            .repository
            .find_page(
                &query.filter,
                query.sort,
                query.skip(),
                query.limit as usize,
            )
            .await?;

        let page = ProductPage::new(items, total_items, query.page, query.limit);

        if page.page > page.total_pages {
            crate::warn_with_trace!(
                "Requested page {} is beyond the last page {}",
                page.page,
                page.total_pages
            );
        }

        crate::info_with_trace!(
            "Found {} products matching criteria, returning {}",
            page.total_items,
            page.items.len()
        );
        Ok(page)
    }

    /// Get a specific product by ID
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &str) -> ServiceResult<Product> {
        crate::info_with_trace!("Retrieving product details");

        let product_id = parse_id("product_id", id)?;

        match self.repository.find_by_id(product_id).await? {
            Some(product) => {
                crate::info_with_trace!("Product found successfully");
                Ok(product)
            }
            None => {
                crate::warn_with_trace!("Product not found");
                Err(ServiceError::ProductNotFound { id: id.to_string() })
            }
        }
    }

    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create_product(&self, request: CreateProductRequest) -> ServiceResult<Product> {
        crate::info_with_trace!("Creating new product");

        request.validate()?;

        let product = Product::new(request);
        let created = self.repository.insert(product).await?;

        crate::info_with_trace!("Product created successfully with ID: {}", created.id);
        Ok(created)
    }

    #[instrument(skip(self, patch), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: &str,
        patch: UpdateProductRequest,
    ) -> ServiceResult<Product> {
        crate::info_with_trace!("Updating product");

        let product_id = parse_id("product_id", id)?;
        patch.validate()?;

        match self.repository.update_by_id(product_id, patch).await? {
            Some(product) => {
                crate::info_with_trace!("Product updated successfully");
                Ok(product)
            }
            None => Err(ServiceError::ProductNotFound { id: id.to_string() }),
        }
    }

    /// Hard delete. Carts that reference the product keep their lines.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: &str) -> ServiceResult<Product> {
        crate::info_with_trace!("Deleting product");

        let product_id = parse_id("product_id", id)?;

        match self.repository.delete_by_id(product_id).await? {
            Some(product) => {
                crate::info_with_trace!("Product deleted successfully");
                Ok(product)
            }
            None => Err(ServiceError::ProductNotFound { id: id.to_string() }),
        }
    }
}
