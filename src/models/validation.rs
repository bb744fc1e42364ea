use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use super::{
    CreateProductRequest, ProductFilter, ServiceError, ServiceResult, UpdateProductRequest,
    ValidationError, ValidationResult,
};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;
pub const MAX_CODE_LENGTH: usize = 64;
pub const MAX_CATEGORY_LENGTH: usize = 100;

impl Validate for CreateProductRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_required_text("title", &self.title, MAX_TITLE_LENGTH)?;
        validate_required_text("code", &self.code, MAX_CODE_LENGTH)?;
        validate_required_text("category", &self.category, MAX_CATEGORY_LENGTH)?;
        validate_description(&self.description)?;
        validate_price("price", &self.price)?;
        Ok(())
    }
}

impl Validate for UpdateProductRequest {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(title) = &self.title {
            validate_required_text("title", title, MAX_TITLE_LENGTH)?;
        }
        if let Some(code) = &self.code {
            validate_required_text("code", code, MAX_CODE_LENGTH)?;
        }
        if let Some(category) = &self.category {
            validate_required_text("category", category, MAX_CATEGORY_LENGTH)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(price) = &self.price {
            validate_price("price", price)?;
        }
        Ok(())
    }
}

impl Validate for ProductFilter {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(min_price) = &self.min_price {
            validate_price("min_price", min_price)?;
        }
        if let Some(max_price) = &self.max_price {
            validate_price("max_price", max_price)?;
        }
        if let (Some(min_price), Some(max_price)) = (&self.min_price, &self.max_price) {
            if min_price > max_price {
                return Err(ValidationError::InvalidValue {
                    field: "min_price".to_string(),
                    value: min_price.to_string(),
                    reason: format!("must not exceed max_price {}", max_price),
                });
            }
        }
        Ok(())
    }
}

/// Validate a mandatory, length-bounded text field
pub fn validate_required_text(field: &str, value: &str, max_length: usize) -> ValidationResult<()> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: field.to_string(),
        });
    }

    let length = trimmed.chars().count();
    if length > max_length {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max_length,
            actual_length: length,
        });
    }

    if trimmed
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t')
    {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Contains invalid control characters".to_string(),
        });
    }

    Ok(())
}

pub fn validate_description(description: &str) -> ValidationResult<()> {
    let length = description.trim().chars().count();
    if length > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max_length: MAX_DESCRIPTION_LENGTH,
            actual_length: length,
        });
    }
    Ok(())
}

/// Prices are non-negative with at most two decimal places
pub fn validate_price(field: &str, price: &Decimal) -> ValidationResult<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: price.to_string(),
            reason: "Price cannot be negative".to_string(),
        });
    }

    if price.normalize().scale() > 2 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: price.to_string(),
            reason: "Price cannot have more than 2 decimal places".to_string(),
        });
    }

    Ok(())
}

/// Parse an identifier taken from a path or body
pub fn parse_id(field: &str, value: &str) -> ValidationResult<Uuid> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: field.to_string(),
        });
    }

    Uuid::parse_str(trimmed).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        expected: "UUID".to_string(),
    })
}

/// Coerce a client-supplied quantity into a positive integer.
///
/// Accepts a JSON integer or a string holding a base-10 integer (surrounding
/// whitespace is ignored). Fractions, floats, booleans, null and zero or
/// negative values are rejected.
pub fn parse_quantity(value: &Value) -> ServiceResult<u64> {
    let invalid = || ServiceError::InvalidQuantity {
        value: value.to_string(),
    };

    let quantity = match value {
        Value::Number(number) => number.as_u64().ok_or_else(invalid)?,
        Value::String(text) => text.trim().parse::<u64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };

    if quantity == 0 {
        return Err(invalid());
    }

    Ok(quantity)
}
