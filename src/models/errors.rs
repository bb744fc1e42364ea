use thiserror::Error;

/// Service-level errors that can occur in business logic
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Product not found: {id}")]
    ProductNotFound { id: String },

    #[error("Cart not found: {id}")]
    CartNotFound { id: String },

    #[error("Product not in cart: cart_id={cart_id}, product_id={product_id}")]
    CartLineNotFound { cart_id: String, product_id: String },

    #[error("Invalid quantity: {value}")]
    InvalidQuantity { value: String },

    #[error("Stock exceeded for product {product_id}: requested={requested}, available={available}")]
    StockExceeded {
        product_id: String,
        requested: u64,
        available: u32,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Repository error: {source}")]
    Repository {
        #[from]
        source: RepositoryError,
    },
}

impl ServiceError {
    /// True for the "something is absent" family of errors
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServiceError::ProductNotFound { .. }
                | ServiceError::CartNotFound { .. }
                | ServiceError::CartLineNotFound { .. }
        )
    }
}

/// Repository-level errors for data access operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Item not found")]
    NotFound,

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("AWS SDK error: {message}")]
    AwsSdk { message: String },

    #[error("DynamoDB table not found: {table_name}. Ensure the table exists and IAM permissions are correct.")]
    TableNotFound { table_name: String },

    #[error("Timed out waiting for table {table_name} to become active")]
    TableNotActive { table_name: String },

    #[error("Invalid stored item: {message}")]
    InvalidItem { message: String },
}

/// Validation errors for input data
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredField { field: String },

    #[error("Invalid field value: {field}={value}, reason={reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Field too long: {field}, max_length={max_length}, actual_length={actual_length}")]
    TooLong {
        field: String,
        max_length: usize,
        actual_length: usize,
    },

    #[error("Invalid format: {field}, expected={expected}")]
    InvalidFormat { field: String, expected: String },

    #[error("Value out of range: {field}, min={min}, max={max}, value={value}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
        value: String,
    },
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::ValidationError {
            message: err.to_string(),
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type alias for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;
