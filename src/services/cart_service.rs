use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::{
    audit,
    cart::CartSession,
    dto::{
        cart::{AddToCartRequest, CartView},
        orders::{CounterCheckoutRequest, GuestCheckoutRequest},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::{Order, ProductRef},
    response::{ApiResponse, Meta},
    services::{
        catalog_service::find_product,
        checkout_service::{self, GuestReceipt},
    },
    state::AppState,
};

async fn lock_session(state: &AppState, id: Uuid) -> AppResult<OwnedMutexGuard<CartSession>> {
    state.carts.lock(id).await.ok_or(AppError::NotFound)
}

pub async fn open_cart(state: &AppState) -> AppResult<ApiResponse<CartView>> {
    let id = state.carts.open();
    tracing::debug!(cart_id = %id, open_carts = state.carts.len(), "cart opened");
    let guard = lock_session(state, id).await?;
    Ok(ApiResponse::success(
        "Cart opened",
        CartView::new(id, guard.cart()),
        Some(Meta::empty()),
    ))
}

pub async fn view_cart(state: &AppState, id: Uuid) -> AppResult<ApiResponse<CartView>> {
    let guard = lock_session(state, id).await?;
    Ok(ApiResponse::success(
        "Cart",
        CartView::new(id, guard.cart()),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(state: &AppState, id: Uuid) -> AppResult<ApiResponse<CartView>> {
    let mut guard = lock_session(state, id).await?;
    guard.cart_mut().clear();
    Ok(ApiResponse::success(
        "Cart cleared",
        CartView::new(id, guard.cart()),
        Some(Meta::empty()),
    ))
}

pub async fn add_item(
    state: &AppState,
    id: Uuid,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let reference = ProductRef::new(payload.category, payload.product_id);

    let product = find_product(&state.orm, &reference)
        .await?
        .filter(|product| product.is_visible)
        .ok_or(AppError::NotFound)?;
    if !product.is_available {
        return Err(AppError::BadRequest(format!(
            "{} is currently unavailable",
            product.name
        )));
    }

    let mut guard = lock_session(state, id).await?;
    guard.cart_mut().add_or_increment(&product);
    tracing::debug!(cart_id = %id, product = %reference, "cart item added");

    Ok(ApiResponse::success(
        "Added to cart",
        CartView::new(id, guard.cart()),
        Some(Meta::empty()),
    ))
}

pub async fn decrease_item(
    state: &AppState,
    id: Uuid,
    product_id: &str,
) -> AppResult<ApiResponse<CartView>> {
    let mut guard = lock_session(state, id).await?;
    guard.cart_mut().decrease_or_remove(product_id);
    Ok(ApiResponse::success(
        "Cart updated",
        CartView::new(id, guard.cart()),
        Some(Meta::empty()),
    ))
}

pub async fn remove_item(
    state: &AppState,
    id: Uuid,
    product_id: &str,
) -> AppResult<ApiResponse<CartView>> {
    let mut guard = lock_session(state, id).await?;
    guard.cart_mut().remove(product_id);
    Ok(ApiResponse::success(
        "Removed from cart",
        CartView::new(id, guard.cart()),
        Some(Meta::empty()),
    ))
}

/// The session lock is held through placement, so the cart cannot change
/// between the snapshot and the clear.
pub async fn guest_checkout(
    state: &AppState,
    id: Uuid,
    payload: GuestCheckoutRequest,
) -> AppResult<ApiResponse<GuestReceipt>> {
    let mut guard = lock_session(state, id).await?;

    let receipt = checkout_service::place_guest_order(
        state.store.as_ref(),
        guard.cart_mut(),
        &payload.customer_name,
        &state.config.hand_off,
    )
    .await?;

    audit::record(
        &state.pool,
        None,
        "order_guest",
        "orders",
        serde_json::json!({ "order_id": receipt.order.id, "cart_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order placed",
        receipt,
        Some(Meta::empty()),
    ))
}

pub async fn counter_checkout(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: CounterCheckoutRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_staff(user)?;

    let mut guard = lock_session(state, id).await?;

    let order = checkout_service::place_counter_order(
        state.store.as_ref(),
        guard.cart_mut(),
        payload.customer_name.as_deref(),
        &user.operator(),
        state.config.checkout_max_attempts,
    )
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_point_of_sale",
        "orders",
        serde_json::json!({ "order_id": order.id, "total": order.total }),
    )
    .await;

    Ok(ApiResponse::success("Sale completed", order, Some(Meta::empty())))
}
