use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::{
    dto::orders::OrderList,
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems, Model as OrderItemModel},
        orders::{Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Order,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
    store::postgres::order_from_entity,
};

// Keeps each `IN (...)` well under the Postgres bind parameter limit.
const HYDRATE_BATCH: usize = 1_000;

/// Loads the lines of `orders` in batched queries and assembles full orders,
/// keeping the input order.
pub(crate) async fn hydrate<C>(conn: &C, orders: Vec<OrderModel>) -> AppResult<Vec<Order>>
where
    C: ConnectionTrait,
{
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
    let mut lines: HashMap<Uuid, Vec<OrderItemModel>> = HashMap::new();
    for batch in ids.chunks(HYDRATE_BATCH) {
        for item in OrderItems::find()
            .filter(OrderItemCol::OrderId.is_in(batch.iter().copied()))
            .all(conn)
            .await?
        {
            lines.entry(item.order_id).or_default().push(item);
        }
    }

    orders
        .into_iter()
        .map(|order| {
            let items = lines.remove(&order.id).unwrap_or_default();
            order_from_entity(order, items).map_err(|e| AppError::Internal(e.into()))
        })
        .collect()
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;

    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(order_type) = query.order_type {
        condition = condition.add(OrderCol::OrderType.eq(order_type.as_str()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = hydrate(&state.orm, models).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?;

    let order = order_from_entity(order, items).map_err(|e| AppError::Internal(e.into()))?;
    Ok(ApiResponse::success("OK", order, Some(Meta::empty())))
}
