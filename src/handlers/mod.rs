pub mod admin;
pub mod api;
pub mod cart;
pub mod health;
pub mod metrics;
pub mod middleware;

pub use admin::AdminState;
pub use api::{ApiError, ApiState};
pub use health::health_check;
pub use metrics::metrics_handler;
pub use middleware::{cors_middleware, request_validation_middleware, security_headers_middleware};
