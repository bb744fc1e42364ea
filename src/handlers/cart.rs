use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use tracing::instrument;

use super::api::{error_response, service_error_to_response, ApiError, ApiState, SUCCESS};
use crate::models::{
    AddToCartRequest, Cart, ReplaceCartRequest, ResolvedCart, SetQuantityRequest,
};

#[derive(Debug, Serialize)]
pub struct CartResponse<T> {
    pub status: &'static str,
    pub cart: T,
}

impl<T> CartResponse<T> {
    fn new(cart: T) -> Json<Self> {
        Json(Self {
            status: SUCCESS,
            cart,
        })
    }
}

type CartResult<T> = Result<Json<CartResponse<T>>, ApiError>;

/// Create an empty cart
#[instrument(name = "create_cart", skip(state))]
pub async fn create_cart(
    State(state): State<ApiState>,
) -> Result<(StatusCode, Json<CartResponse<Cart>>), ApiError> {
    let cart = state
        .business
        .trace_cart_operation("create_cart", None, state.cart_service.create_cart())
        .await
        .map_err(service_error_to_response)?;

    Ok((StatusCode::CREATED, CartResponse::new(cart)))
}

/// Get a cart with its products resolved
#[instrument(name = "get_cart", skip(state), fields(cart_id = %cart_id))]
pub async fn get_cart(
    State(state): State<ApiState>,
    Path(cart_id): Path<String>,
) -> CartResult<ResolvedCart> {
    fetch_cart(&state, &cart_id).await
}

/// Get the configured default cart
#[instrument(name = "get_default_cart", skip(state))]
pub async fn get_default_cart(State(state): State<ApiState>) -> CartResult<ResolvedCart> {
    let cart_id = default_cart_id(&state)?;
    fetch_cart(&state, &cart_id).await
}

/// Add a product to the default cart
#[instrument(name = "add_to_default_cart", skip(state, body), fields(product_id = %product_id))]
pub async fn add_to_default_cart(
    State(state): State<ApiState>,
    Path(product_id): Path<String>,
    body: Bytes,
) -> CartResult<Cart> {
    let cart_id = default_cart_id(&state)?;
    add_to_cart(&state, &cart_id, &product_id, &body).await
}

#[instrument(name = "remove_from_default_cart", skip(state), fields(product_id = %product_id))]
pub async fn remove_from_default_cart(
    State(state): State<ApiState>,
    Path(product_id): Path<String>,
) -> CartResult<Cart> {
    let cart_id = default_cart_id(&state)?;
    remove_from_cart(&state, &cart_id, &product_id).await
}

#[instrument(name = "empty_default_cart", skip(state))]
pub async fn empty_default_cart(State(state): State<ApiState>) -> CartResult<Cart> {
    let cart_id = default_cart_id(&state)?;
    clear_cart(&state, &cart_id).await
}

fn default_cart_id(state: &ApiState) -> Result<String, ApiError> {
    state
        .default_cart_id
        .clone()
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "No default cart configured"))
}

async fn fetch_cart(state: &ApiState, cart_id: &str) -> CartResult<ResolvedCart> {
    let cart = state
        .business
        .trace_cart_operation("get_cart", Some(cart_id), state.cart_service.get_cart(cart_id))
        .await
        .map_err(service_error_to_response)?;

    Ok(CartResponse::new(cart))
}

/// Replace every line of a cart
#[instrument(name = "replace_cart", skip(state, body), fields(cart_id = %cart_id))]
pub async fn replace_cart(
    State(state): State<ApiState>,
    Path(cart_id): Path<String>,
    body: Result<Json<ReplaceCartRequest>, JsonRejection>,
) -> CartResult<Cart> {
    let Json(request) = body.map_err(rejection_to_response)?;
    let lines = request.parse().map_err(service_error_to_response)?;

    let cart = state
        .business
        .trace_cart_operation(
            "replace_lines",
            Some(&cart_id),
            state.cart_service.replace_lines(&cart_id, lines),
        )
        .await
        .map_err(service_error_to_response)?;

    Ok(CartResponse::new(cart))
}

/// Remove every line from a cart
#[instrument(name = "empty_cart", skip(state), fields(cart_id = %cart_id))]
pub async fn empty_cart(
    State(state): State<ApiState>,
    Path(cart_id): Path<String>,
) -> CartResult<Cart> {
    clear_cart(&state, &cart_id).await
}

async fn clear_cart(state: &ApiState, cart_id: &str) -> CartResult<Cart> {
    let cart = state
        .business
        .trace_cart_operation(
            "empty_cart",
            Some(cart_id),
            state.cart_service.empty_cart(cart_id),
        )
        .await
        .map_err(service_error_to_response)?;

    Ok(CartResponse::new(cart))
}

/// Add a product to a cart. The body is optional; without one a single unit is added.
#[instrument(name = "add_to_cart", skip(state, body), fields(cart_id = %cart_id, product_id = %product_id))]
pub async fn add_product(
    State(state): State<ApiState>,
    Path((cart_id, product_id)): Path<(String, String)>,
    body: Bytes,
) -> CartResult<Cart> {
    add_to_cart(&state, &cart_id, &product_id, &body).await
}

async fn add_to_cart(
    state: &ApiState,
    cart_id: &str,
    product_id: &str,
    body: &[u8],
) -> CartResult<Cart> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        AddToCartRequest::default()
    } else {
        serde_json::from_slice::<AddToCartRequest>(body).map_err(|e| {
            error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid request body: {}", e),
            )
        })?
    };
    let quantity = request.quantity().map_err(service_error_to_response)?;

    crate::info_with_trace!("Adding {} units to cart", quantity);

    let cart = state
        .business
        .trace_cart_operation(
            "add_product",
            Some(cart_id),
            state.cart_service.add_product(cart_id, product_id, quantity),
        )
        .await
        .map_err(service_error_to_response)?;

    Ok(CartResponse::new(cart))
}

/// Overwrite the quantity of a cart line
#[instrument(name = "set_cart_quantity", skip(state, body), fields(cart_id = %cart_id, product_id = %product_id))]
pub async fn set_quantity(
    State(state): State<ApiState>,
    Path((cart_id, product_id)): Path<(String, String)>,
    body: Result<Json<SetQuantityRequest>, JsonRejection>,
) -> CartResult<Cart> {
    let Json(request) = body.map_err(rejection_to_response)?;
    let quantity = request.quantity.resolve().map_err(service_error_to_response)?;

    let cart = state
        .business
        .trace_cart_operation(
            "set_quantity",
            Some(&cart_id),
            state
                .cart_service
                .set_quantity(&cart_id, &product_id, quantity),
        )
        .await
        .map_err(service_error_to_response)?;

    Ok(CartResponse::new(cart))
}

#[instrument(name = "remove_from_cart", skip(state), fields(cart_id = %cart_id, product_id = %product_id))]
pub async fn remove_product(
    State(state): State<ApiState>,
    Path((cart_id, product_id)): Path<(String, String)>,
) -> CartResult<Cart> {
    remove_from_cart(&state, &cart_id, &product_id).await
}

async fn remove_from_cart(state: &ApiState, cart_id: &str, product_id: &str) -> CartResult<Cart> {
    let cart = state
        .business
        .trace_cart_operation(
            "remove_product",
            Some(cart_id),
            state.cart_service.remove_product(cart_id, product_id),
        )
        .await
        .map_err(service_error_to_response)?;

    Ok(CartResponse::new(cart))
}

pub(crate) fn rejection_to_response(rejection: JsonRejection) -> ApiError {
    let status = match rejection {
        JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        _ => StatusCode::BAD_REQUEST,
    };
    error_response(status, &rejection.body_text())
}
