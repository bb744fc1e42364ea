use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::instrument;

use super::api::{error_response, ApiError};
use crate::observability::Metrics;

const SCRAPE_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus scrape endpoint. Encoding failures use the same JSON error body as the API.
#[instrument(name = "scrape_metrics", level = "debug", skip_all)]
pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Result<Response, ApiError> {
    let exposition = metrics.encode().map_err(|e| {
        crate::error_with_trace!("Metrics scrape failed: {}", e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics")
    })?;

    Ok(([(header::CONTENT_TYPE, SCRAPE_CONTENT_TYPE)], exposition).into_response())
}
