use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::TraceContextExt;
use std::{future::Future, sync::Arc, time::Instant};
use tracing::{error, info, instrument, warn, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::Metrics;

/// Request tracing and HTTP metrics for every route
pub async fn observability_middleware(
    metrics: Arc<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let uri = request.uri().to_string();

    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    // first hop of X-Forwarded-For, then X-Real-IP
    let client_ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .or_else(|| {
            request
                .headers()
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
        })
        .unwrap_or("unknown")
        .trim()
        .to_string();

    // Route template keeps metric cardinality bounded by the route table
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched_path| matched_path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let span_name = format!("{} {}", method, endpoint);

    let span = tracing::info_span!(
        target: "storefront_rs::http",
        "{}", span_name,
        otel.name = %span_name,
        otel.kind = "server",
        http.method = %method,
        http.route = %endpoint,
        http.url = %uri,
        http.user_agent = %user_agent,
        client.address = %client_ip,
        http.response.status_code = tracing::field::Empty,
        http.response_time_ms = tracing::field::Empty,
    );

    async {
        metrics.increment_in_flight(&method, &endpoint);

        let trace_id = tracing::Span::current()
            .context()
            .span()
            .span_context()
            .trace_id()
            .to_string();

        info!(trace_id = %trace_id, method = %method, path = %endpoint, client_ip = %client_ip, "Processing request");

        let response = next.run(request).await;

        let duration = start_time.elapsed();
        let duration_ms = duration.as_millis();
        let status_code = response.status().as_u16();

        let current_span = tracing::Span::current();
        current_span.record("http.response.status_code", status_code);
        current_span.record("http.response_time_ms", duration_ms);

        let span_context = current_span.context();
        let otel_span = span_context.span();
        if status_code >= 500 {
            otel_span.set_status(opentelemetry::trace::Status::error("HTTP server error"));
        } else {
            otel_span.set_status(opentelemetry::trace::Status::Ok);
        }

        metrics.record_http_request(&method, &endpoint, status_code, duration.as_secs_f64());
        metrics.decrement_in_flight(&method, &endpoint);

        if status_code >= 500 {
            error!(
                trace_id = %trace_id,
                method = %method,
                path = %endpoint,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request failed"
            );
        } else if status_code >= 400 {
            warn!(
                trace_id = %trace_id,
                method = %method,
                path = %endpoint,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request rejected"
            );
        } else {
            info!(
                trace_id = %trace_id,
                method = %method,
                path = %endpoint,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request completed successfully"
            );
        }

        response
    }
    .instrument(span)
    .await
}

/// Wraps service calls with a span and business counters
#[derive(Clone)]
pub struct BusinessTracingMiddleware {
    metrics: Arc<Metrics>,
}

impl BusinessTracingMiddleware {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    /// Trace a catalog operation
    #[instrument(skip_all, fields(
        operation = %operation,
        category = category,
    ))]
    pub async fn trace_catalog_operation<F, T, E>(
        &self,
        operation: &str,
        category: Option<&str>,
        future: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();

        let result = future.await;
        self.metrics
            .record_catalog_operation(operation, category, result.is_ok());

        match &result {
            Ok(_) => info!(
                duration_ms = start_time.elapsed().as_millis(),
                "Catalog operation completed successfully"
            ),
            Err(error) => warn!(
                error = %error,
                duration_ms = start_time.elapsed().as_millis(),
                "Catalog operation failed"
            ),
        }

        result
    }

    /// Trace a cart operation
    #[instrument(skip_all, fields(
        operation = %operation,
        cart_id = cart_id,
    ))]
    pub async fn trace_cart_operation<F, T, E>(
        &self,
        operation: &str,
        cart_id: Option<&str>,
        future: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();

        let result = future.await;
        self.metrics.record_cart_operation(operation, result.is_ok());

        match &result {
            Ok(_) => info!(
                duration_ms = start_time.elapsed().as_millis(),
                "Cart operation completed successfully"
            ),
            Err(error) => warn!(
                error = %error,
                duration_ms = start_time.elapsed().as_millis(),
                "Cart operation failed"
            ),
        }

        result
    }
}
