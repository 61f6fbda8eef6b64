use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        cart::{AddToCartRequest, CartView},
        orders::{CounterCheckoutRequest, GuestCheckoutRequest},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    services::{cart_service, checkout_service::GuestReceipt},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(open_cart))
        .route("/{id}", axum::routing::get(view_cart).delete(clear_cart))
        .route("/{id}/items", post(add_item))
        .route("/{id}/items/{product_id}", delete(remove_item))
        .route("/{id}/items/{product_id}/decrease", post(decrease_item))
        .route("/{id}/checkout/guest", post(guest_checkout))
        .route("/{id}/checkout/counter", post(counter_checkout))
}

#[utoipa::path(
    post,
    path = "/api/carts",
    responses(
        (status = 200, description = "Open an empty cart session", body = ApiResponse<CartView>)
    ),
    tag = "Cart"
)]
pub async fn open_cart(State(state): State<AppState>) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::open_cart(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/carts/{id}",
    params(("id" = Uuid, Path, description = "Cart ID")),
    responses(
        (status = 200, description = "Cart contents and totals", body = ApiResponse<CartView>),
        (status = 404, description = "Unknown or expired cart")
    ),
    tag = "Cart"
)]
pub async fn view_cart(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::view_cart(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/carts/{id}",
    params(("id" = Uuid, Path, description = "Cart ID")),
    responses(
        (status = 200, description = "Empty the cart", body = ApiResponse<CartView>),
        (status = 404, description = "Unknown or expired cart")
    ),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::clear_cart(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/carts/{id}/items",
    params(("id" = Uuid, Path, description = "Cart ID")),
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Add one unit of a product", body = ApiResponse<CartView>),
        (status = 400, description = "Product unavailable"),
        (status = 404, description = "Unknown cart or product")
    ),
    tag = "Cart"
)]
pub async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::add_item(&state, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/carts/{id}/items/{product_id}/decrease",
    params(
        ("id" = Uuid, Path, description = "Cart ID"),
        ("product_id" = String, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Remove one unit; the line goes away at zero", body = ApiResponse<CartView>),
        (status = 404, description = "Unknown or expired cart")
    ),
    tag = "Cart"
)]
pub async fn decrease_item(
    State(state): State<AppState>,
    Path((id, product_id)): Path<(Uuid, String)>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::decrease_item(&state, id, &product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/carts/{id}/items/{product_id}",
    params(
        ("id" = Uuid, Path, description = "Cart ID"),
        ("product_id" = String, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Drop the line", body = ApiResponse<CartView>),
        (status = 404, description = "Unknown or expired cart")
    ),
    tag = "Cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    Path((id, product_id)): Path<(Uuid, String)>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::remove_item(&state, id, &product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/carts/{id}/checkout/guest",
    params(("id" = Uuid, Path, description = "Cart ID")),
    request_body = GuestCheckoutRequest,
    responses(
        (status = 200, description = "Order recorded, hand-off link returned", body = ApiResponse<GuestReceipt>),
        (status = 400, description = "Empty cart or missing name"),
        (status = 404, description = "Unknown or expired cart"),
        (status = 503, description = "Order store unavailable, safe to retry")
    ),
    tag = "Checkout"
)]
pub async fn guest_checkout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GuestCheckoutRequest>,
) -> AppResult<Json<ApiResponse<GuestReceipt>>> {
    let resp = cart_service::guest_checkout(&state, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/carts/{id}/checkout/counter",
    params(("id" = Uuid, Path, description = "Cart ID")),
    request_body = CounterCheckoutRequest,
    responses(
        (status = 200, description = "Stock decremented and sale recorded", body = ApiResponse<Order>),
        (status = 400, description = "Empty cart"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown cart or product"),
        (status = 409, description = "Insufficient stock"),
        (status = 503, description = "Order store unavailable, safe to retry")
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn counter_checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CounterCheckoutRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = cart_service::counter_checkout(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
