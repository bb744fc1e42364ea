use axum::response::Json;
use serde_json::{json, Value};
use tracing::instrument;

/// Liveness probe; does not touch DynamoDB
#[instrument(name = "health_check")]
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "storefront-rs",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
