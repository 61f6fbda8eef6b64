//! Back-office product management.
//!
//! Display orders are unique per category. Every write that may pick or
//! change one takes a transaction-scoped advisory lock on the category first,
//! so the "is it free / what is the next one" check and the write cannot
//! interleave with another admin's. The unique index stays as a backstop.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseTransaction, DbErr,
    EntityTrait, QueryFilter, QuerySelect, Set, SqlErr, Statement, TransactionTrait, Value,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::products::{ActiveModel, Column, Entity as Products},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, Product},
    response::{ApiResponse, Meta},
    services::catalog_service::{list_category, product_from_entity},
    state::AppState,
};

pub(crate) fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Product name is required.".into()));
    }
    Ok(name.to_string())
}

pub(crate) fn max_price() -> Decimal {
    Decimal::new(1_000_000, 0)
}

pub(crate) fn validate_price(price: Decimal) -> AppResult<Decimal> {
    if price <= Decimal::ZERO {
        return Err(AppError::BadRequest(
            "A valid positive price is required.".into(),
        ));
    }
    if price > max_price() {
        return Err(AppError::BadRequest(format!(
            "Price cannot exceed {}.",
            max_price()
        )));
    }
    Ok(price.round_dp(2))
}

pub(crate) fn validate_stock(stock: i32) -> AppResult<i32> {
    if stock < 0 {
        return Err(AppError::BadRequest(
            "Stock must be a non-negative integer.".into(),
        ));
    }
    Ok(stock)
}

pub(crate) fn validate_display_order(display_order: i32) -> AppResult<i32> {
    if display_order < 0 {
        return Err(AppError::BadRequest(
            "Order ID must be a positive number.".into(),
        ));
    }
    Ok(display_order)
}

/// Next free display order after the current maximum; 1 for an empty
/// category.
pub(crate) fn next_display_order(current_max: Option<i32>) -> i32 {
    current_max.map_or(1, |max| max.saturating_add(1))
}

fn display_order_taken(display_order: i32) -> AppError {
    AppError::Conflict(format!("Order ID {display_order} is already in use."))
}

fn map_write_err(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Order ID is already in use.".into())
        }
        _ => AppError::OrmError(err),
    }
}

async fn lock_category(txn: &DatabaseTransaction, category: Category) -> AppResult<()> {
    txn.execute(Statement::from_sql_and_values(
        DatabaseBackend::Postgres,
        "SELECT pg_advisory_xact_lock(hashtext($1))",
        [Value::from(category.as_str())],
    ))
    .await?;
    Ok(())
}

/// Fails when another product of the category already holds `display_order`.
async fn ensure_display_order_free(
    txn: &DatabaseTransaction,
    category: Category,
    display_order: i32,
    except_id: Option<&str>,
) -> AppResult<()> {
    let mut finder = Products::find()
        .filter(Column::Category.eq(category.as_str()))
        .filter(Column::DisplayOrder.eq(display_order));
    if let Some(id) = except_id {
        finder = finder.filter(Column::Id.ne(id));
    }

    if finder.one(txn).await?.is_some() {
        return Err(display_order_taken(display_order));
    }
    Ok(())
}

async fn allocate_display_order(txn: &DatabaseTransaction, category: Category) -> AppResult<i32> {
    let current_max: Option<Option<i32>> = Products::find()
        .select_only()
        .column_as(Column::DisplayOrder.max(), "max_display_order")
        .filter(Column::Category.eq(category.as_str()))
        .into_tuple()
        .one(txn)
        .await?;
    Ok(next_display_order(current_max.flatten()))
}

pub async fn list_products(
    state: &AppState,
    user: &AuthUser,
    category: Category,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;

    let items = list_category(&state.orm, category, false).await?;
    let meta = Meta::unpaged(items.len());
    Ok(ApiResponse::success(
        category.display_name(),
        ProductList { items },
        Some(meta),
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    category: Category,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    let name = validate_name(&payload.name)?;
    let price = validate_price(payload.price)?;
    let stock = validate_stock(payload.stock)?;
    let requested_order = payload.display_order.map(validate_display_order).transpose()?;

    let txn = state.orm.begin().await?;
    lock_category(&txn, category).await?;

    let display_order = match requested_order {
        Some(display_order) => {
            ensure_display_order_free(&txn, category, display_order, None).await?;
            display_order
        }
        None => allocate_display_order(&txn, category).await?,
    };

    let now = Utc::now();
    let model = ActiveModel {
        category: Set(category.as_str().to_string()),
        id: Set(Uuid::new_v4().to_string()),
        name: Set(name),
        price: Set(price),
        image_url: Set(payload.image_url.trim().to_string()),
        is_available: Set(payload.is_available),
        is_visible: Set(payload.is_visible),
        display_order: Set(display_order),
        stock: Set(stock),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await
    .map_err(map_write_err)?;

    txn.commit().await?;

    let product = product_from_entity(model)?;
    tracing::info!(product = %product.reference(), display_order, "product created");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "category": category, "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    category: Category,
    id: &str,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    lock_category(&txn, category).await?;

    let existing = Products::find_by_id((category.as_str().to_string(), id.to_string()))
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.clone().into();
    if let Some(name) = payload.name {
        active.name = Set(validate_name(&name)?);
    }
    if let Some(price) = payload.price {
        active.price = Set(validate_price(price)?);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(validate_stock(stock)?);
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(image_url.trim().to_string());
    }
    if let Some(is_available) = payload.is_available {
        active.is_available = Set(is_available);
    }
    if let Some(is_visible) = payload.is_visible {
        active.is_visible = Set(is_visible);
    }
    if let Some(display_order) = payload.display_order {
        let display_order = validate_display_order(display_order)?;
        if display_order != existing.display_order {
            ensure_display_order_free(&txn, category, display_order, Some(id)).await?;
            active.display_order = Set(display_order);
        }
    }
    active.updated_at = Set(Utc::now().into());

    let model = active.update(&txn).await.map_err(map_write_err)?;
    txn.commit().await?;

    let product = product_from_entity(model)?;
    tracing::info!(product = %product.reference(), "product updated");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "category": category, "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product updated",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    category: Category,
    id: &str,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let result = Products::delete_by_id((category.as_str().to_string(), id.to_string()))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(category = %category, product_id = id, "product deleted");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "category": category, "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product deleted",
        serde_json::json!({ "deleted": id }),
        Some(Meta::empty()),
    ))
}
