use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Error as DynamoDbError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::error;

use crate::models::{RepositoryError, RepositoryResult};

pub(crate) type Item = HashMap<String, AttributeValue>;

/// Client span wrapping a single DynamoDB call
pub(crate) fn dynamodb_span(table_name: &str, region: &str, operation: &str) -> tracing::Span {
    tracing::info_span!(
        "DynamoDB",
        "aws.service" = "DynamoDB",
        "aws.operation" = operation,
        "aws.region" = %region,
        "aws.dynamodb.table_name" = %table_name,
        "aws.request_id" = tracing::field::Empty,

        "aws.remote.service" = "AWS::DynamoDB",
        "aws.remote.operation" = operation,
        "aws.remote.resource.type" = "AWS::DynamoDB::Table",
        "aws.remote.resource.identifier" = %table_name,

        // OpenTelemetry semantic conventions
        "otel.kind" = "client",
        "otel.name" = format!("DynamoDB.{}", operation),
        "rpc.system" = "aws-api",
        "rpc.service" = "AmazonDynamoDBv2",
        "rpc.method" = operation,
        "db.system" = "dynamodb",
        "db.name" = %table_name,
        "db.operation" = operation,
    )
}

/// Convert a DynamoDB error into a RepositoryError
pub(crate) fn map_dynamodb_error(table_name: &str, error: DynamoDbError) -> RepositoryError {
    error!(table = %table_name, "DynamoDB error: {:?}", error);

    if let DynamoDbError::ResourceNotFoundException(_) = error {
        return RepositoryError::TableNotFound {
            table_name: table_name.to_string(),
        };
    }

    RepositoryError::AwsSdk {
        message: error.to_string(),
    }
}

fn missing(field: &str) -> RepositoryError {
    RepositoryError::InvalidItem {
        message: format!("Missing or invalid {}", field),
    }
}

pub(crate) fn get_string(item: &Item, field: &str) -> RepositoryResult<String> {
    item.get(field)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| missing(field))
}

pub(crate) fn get_number<T: FromStr>(item: &Item, field: &str) -> RepositoryResult<T> {
    item.get(field)
        .and_then(|v| v.as_n().ok())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| missing(field))
}

pub(crate) fn get_decimal(item: &Item, field: &str) -> RepositoryResult<Decimal> {
    item.get(field)
        .and_then(|v| v.as_n().ok())
        .and_then(|s| Decimal::from_str(s).ok())
        .ok_or_else(|| missing(field))
}

pub(crate) fn get_timestamp(item: &Item, field: &str) -> RepositoryResult<DateTime<Utc>> {
    item.get(field)
        .and_then(|v| v.as_s().ok())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| missing(field))
}

pub(crate) fn get_uuid(item: &Item, field: &str) -> RepositoryResult<uuid::Uuid> {
    item.get(field)
        .and_then(|v| v.as_s().ok())
        .and_then(|s| uuid::Uuid::parse_str(s).ok())
        .ok_or_else(|| missing(field))
}

pub(crate) fn id_key(id: uuid::Uuid) -> AttributeValue {
    AttributeValue::S(id.to_string())
}
