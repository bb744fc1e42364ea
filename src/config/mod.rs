use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::MAX_PAGE_SIZE;

const ENV_PREFIX: &str = "STOREFRONT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub store: StoreConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_products_table")]
    pub products_table_name: String,
    #[serde(default = "default_carts_table")]
    pub carts_table_name: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Overrides the DynamoDB endpoint, e.g. for DynamoDB Local
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Cart used by `/api/cart` and advertised on product listings
    #[serde(default)]
    pub default_cart_id: Option<String>,
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub enable_json_logging: bool,
}

impl Config {
    /// Load every section from `STOREFRONT_*` environment variables
    pub fn from_environment() -> Result<Self, ConfigError> {
        Self::from_source(config::Environment::with_prefix(ENV_PREFIX))
    }

    pub(crate) fn from_source(source: config::Environment) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(source)
            .build()
            .map_err(|e| ConfigError::LoadError {
                message: format!("Failed to load configuration: {}", e),
            })?;

        let config = Config {
            server: deserialize_section(&settings, "server")?,
            database: deserialize_section(&settings, "database")?,
            store: deserialize_section(&settings, "store")?,
            observability: deserialize_section(&settings, "observability")?,
        };

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(invalid("Request timeout cannot be 0"));
        }

        if self.database.products_table_name.is_empty() {
            return Err(invalid("Products table name cannot be empty"));
        }

        if self.database.carts_table_name.is_empty() {
            return Err(invalid("Carts table name cannot be empty"));
        }

        if !(1..=MAX_PAGE_SIZE).contains(&self.store.default_page_size) {
            return Err(invalid(&format!(
                "Default page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        if let Some(cart_id) = &self.store.default_cart_id {
            Uuid::parse_str(cart_id)
                .map_err(|_| invalid(&format!("Default cart id is not a UUID: {}", cart_id)))?;
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_seconds: default_timeout(),
                max_request_size: default_max_request_size(),
            },
            database: DatabaseConfig {
                products_table_name: default_products_table(),
                carts_table_name: default_carts_table(),
                region: default_region(),
                endpoint_url: None,
            },
            store: StoreConfig {
                default_cart_id: None,
                default_page_size: default_page_size(),
            },
            observability: ObservabilityConfig {
                service_name: default_service_name(),
                service_version: default_service_version(),
                otlp_endpoint: None,
                log_level: default_log_level(),
                enable_json_logging: false,
            },
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn deserialize_section<T: serde::de::DeserializeOwned>(
    settings: &config::Config,
    section: &str,
) -> Result<T, ConfigError> {
    settings
        .clone()
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError {
        message: message.to_string(),
    }
}

pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_max_request_size() -> usize {
    1024 * 1024
}

pub(crate) fn default_products_table() -> String {
    "StorefrontProducts".to_string()
}

pub(crate) fn default_carts_table() -> String {
    "StorefrontCarts".to_string()
}

pub(crate) fn default_region() -> String {
    "us-west-2".to_string()
}

pub(crate) fn default_page_size() -> u32 {
    crate::models::DEFAULT_PAGE_SIZE
}

pub(crate) fn default_service_name() -> String {
    "storefront-rs".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
