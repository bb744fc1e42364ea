use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use super::dynamodb::map_dynamodb_error;
use crate::models::{RepositoryError, RepositoryResult};

const MAX_ACTIVE_CHECKS: u32 = 30;
const ACTIVE_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Manages DynamoDB table creation
pub struct TableManager {
    client: Arc<DynamoDbClient>,
}

impl TableManager {
    pub fn new(client: Arc<DynamoDbClient>) -> Self {
        Self { client }
    }

    /// Create the products table
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn create_products_table(&self, table_name: &str) -> RepositoryResult<()> {
        info!("Creating products table");
        self.create_id_keyed_table(table_name).await
    }

    /// Create the carts table
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn create_carts_table(&self, table_name: &str) -> RepositoryResult<()> {
        info!("Creating carts table");
        self.create_id_keyed_table(table_name).await
    }

    /// Both tables share a single string hash key named `id`
    async fn create_id_keyed_table(&self, table_name: &str) -> RepositoryResult<()> {
        if self.table_exists(table_name).await? {
            info!("Table {} already exists", table_name);
            return Ok(());
        }

        let attribute_definition = AttributeDefinition::builder()
            .attribute_name("id")
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(|e| RepositoryError::AwsSdk {
                message: format!("Failed to build attribute definition: {}", e),
            })?;

        let key_schema = KeySchemaElement::builder()
            .attribute_name("id")
            .key_type(KeyType::Hash)
            .build()
            .map_err(|e| RepositoryError::AwsSdk {
                message: format!("Failed to build key schema: {}", e),
            })?;

        self.client
            .create_table()
            .table_name(table_name)
            .attribute_definitions(attribute_definition)
            .key_schema(key_schema)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| map_dynamodb_error(table_name, e.into()))?;

        info!("Table creation initiated, waiting for table to become active");
        self.wait_for_table_active(table_name).await?;
        info!("Table {} created successfully", table_name);

        Ok(())
    }

    /// Check if a table exists
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn table_exists(&self, table_name: &str) -> RepositoryResult<bool> {
        match self.client.describe_table().table_name(table_name).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_resource_not_found_exception())
                    .unwrap_or(false);

                if not_found {
                    info!("Table {} does not exist", table_name);
                    Ok(false)
                } else {
                    error!("Error checking table existence: {}", e);
                    Err(map_dynamodb_error(table_name, e.into()))
                }
            }
        }
    }

    #[instrument(skip(self), fields(table_name = %table_name))]
    async fn wait_for_table_active(&self, table_name: &str) -> RepositoryResult<()> {
        for _ in 0..MAX_ACTIVE_CHECKS {
            let response = self
                .client
                .describe_table()
                .table_name(table_name)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(table_name, e.into()))?;

            match response.table.and_then(|table| table.table_status) {
                Some(TableStatus::Active) => {
                    info!("Table {} is now active", table_name);
                    return Ok(());
                }
                Some(status) => info!("Table {} status: {:?}, waiting...", table_name, status),
                None => warn!("Table {} status unknown, waiting...", table_name),
            }

            tokio::time::sleep(ACTIVE_CHECK_INTERVAL).await;
        }

        error!("Timeout waiting for table {} to become active", table_name);
        Err(RepositoryError::TableNotActive {
            table_name: table_name.to_string(),
        })
    }

    /// Create both tables concurrently
    #[instrument(skip(self))]
    pub async fn create_all_tables(
        &self,
        products_table: &str,
        carts_table: &str,
    ) -> RepositoryResult<()> {
        info!("Creating all tables");

        let (products_result, carts_result) = tokio::join!(
            self.create_products_table(products_table),
            self.create_carts_table(carts_table)
        );

        products_result?;
        carts_result?;

        info!("All tables created successfully");
        Ok(())
    }
}
