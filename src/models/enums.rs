use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sort order applied to product listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    None,
    #[serde(alias = "menor")]
    Asc,
    #[serde(alias = "mayor")]
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::None => write!(f, "none"),
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(SortOrder::None),
            "asc" | "menor" => Ok(SortOrder::Asc),
            "desc" | "mayor" => Ok(SortOrder::Desc),
            _ => Err(format!("Invalid sort order: {}", s)),
        }
    }
}

/// Active/inactive flag of a product, stored as a boolean
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
}

impl From<bool> for ProductStatus {
    fn from(active: bool) -> Self {
        if active {
            ProductStatus::Active
        } else {
            ProductStatus::Inactive
        }
    }
}

impl From<ProductStatus> for bool {
    fn from(status: ProductStatus) -> Self {
        status == ProductStatus::Active
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductStatus::Active => write!(f, "active"),
            ProductStatus::Inactive => write!(f, "inactive"),
        }
    }
}
