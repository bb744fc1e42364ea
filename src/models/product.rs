use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use uuid::Uuid;

use super::{ProductStatus, SortOrder, ValidationError, ValidationResult};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Core product model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub code: String,
    pub price: Decimal,
    pub stock: u32,
    pub category: String,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request model for creating a new product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProductRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub code: String,
    pub price: Decimal,
    pub stock: u32,
    pub category: String,
    #[serde(default)]
    pub status: ProductStatus,
}

/// Partial update of a product; absent fields are left untouched
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<u32>,
    pub category: Option<String>,
    pub status: Option<ProductStatus>,
}

/// Filter part of a product listing: category equality plus an inclusive price range
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

/// A fully normalized listing request
#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub sort: SortOrder,
    pub page: u32,
    pub limit: u32,
}

/// Query string accepted by the product listing endpoint.
/// Values stay raw until `into_query` so that blank form fields count as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductListParams {
    pub limit: Option<String>,
    pub page: Option<String>,
    pub sort: Option<String>,
    /// Category to match exactly
    pub query: Option<String>,
    #[serde(rename = "minPrice")]
    pub min_price: Option<String>,
    #[serde(rename = "maxPrice")]
    pub max_price: Option<String>,
}

/// Page descriptor returned by product listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total_items: usize,
    pub limit: u32,
    pub total_pages: u32,
    pub page: u32,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
}

impl Product {
    /// Create a new Product instance with generated ID and timestamps
    pub fn new(request: CreateProductRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: request.title,
            description: request.description,
            code: request.code,
            price: request.price,
            stock: request.stock,
            category: request.category,
            status: request.status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update
    pub fn apply(&mut self, patch: UpdateProductRequest) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(code) = patch.code {
            self.code = code;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }

    /// Whether `quantity` units can be held in a single cart line
    pub fn can_supply(&self, quantity: u64) -> bool {
        quantity <= u64::from(self.stock)
    }
}

impl ProductFilter {
    /// Check if the product matches the filter
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category {
            if &product.category != category {
                return false;
            }
        }

        if let Some(min_price) = &self.min_price {
            if &product.price < min_price {
                return false;
            }
        }

        if let Some(max_price) = &self.max_price {
            if &product.price > max_price {
                return false;
            }
        }

        true
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.min_price.is_none() && self.max_price.is_none()
    }
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            filter: ProductFilter::default(),
            sort: SortOrder::None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ProductQuery {
    /// Treat page 0 as the first page and clamp the page size to `1..=MAX_PAGE_SIZE`
    pub fn normalize(mut self) -> Self {
        self.page = self.page.max(1);
        self.limit = self.limit.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Number of matching products to skip before the requested page
    pub fn skip(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.limit as usize)
    }
}

impl ProductListParams {
    pub fn into_query(self, default_limit: u32) -> ValidationResult<ProductQuery> {
        let sort = match self.sort.as_deref() {
            Some(raw) => raw.parse().map_err(|_| ValidationError::InvalidValue {
                field: "sort".to_string(),
                value: raw.to_string(),
                reason: "expected asc or desc".to_string(),
            })?,
            None => SortOrder::None,
        };

        let category = non_blank(self.query);

        let query = ProductQuery {
            filter: ProductFilter {
                category,
                min_price: parse_param("minPrice", self.min_price, DECIMAL_EXPECTED)?,
                max_price: parse_param("maxPrice", self.max_price, DECIMAL_EXPECTED)?,
            },
            sort,
            page: parse_param("page", self.page, WHOLE_EXPECTED)?.unwrap_or(1),
            limit: parse_param("limit", self.limit, WHOLE_EXPECTED)?.unwrap_or(default_limit),
        };

        Ok(query.normalize())
    }
}

const DECIMAL_EXPECTED: &str = "expected a decimal number";
const WHOLE_EXPECTED: &str = "expected a whole number";

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_param<T: FromStr>(
    field: &str,
    value: Option<String>,
    reason: &str,
) -> ValidationResult<Option<T>> {
    non_blank(value)
        .map(|raw| {
            raw.parse().map_err(|_| ValidationError::InvalidValue {
                field: field.to_string(),
                value: raw.clone(),
                reason: reason.to_string(),
            })
        })
        .transpose()
}

impl SortOrder {
    /// Order two products; ties fall back to creation order, then id
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let by_price = match self {
            SortOrder::None => Ordering::Equal,
            SortOrder::Asc => a.price.cmp(&b.price),
            SortOrder::Desc => b.price.cmp(&a.price),
        };
        by_price
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }

    pub fn sort(&self, products: &mut [Product]) {
        products.sort_by(|a, b| self.compare(a, b));
    }
}

impl ProductPage {
    /// Build the page descriptor for one page of a listing
    pub fn new(items: Vec<Product>, total_items: usize, page: u32, limit: u32) -> Self {
        let limit = limit.max(1);
        let total_pages = (total_items as u64)
            .div_ceil(u64::from(limit))
            .clamp(1, u64::from(u32::MAX)) as u32;
        let page = page.max(1);

        let has_prev_page = page > 1;
        let has_next_page = page < total_pages;

        Self {
            items,
            total_items,
            limit,
            total_pages,
            page,
            has_prev_page,
            has_next_page,
            prev_page: has_prev_page.then(|| page - 1),
            next_page: has_next_page.then(|| page + 1),
        }
    }
}
