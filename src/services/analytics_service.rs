//! Sales dashboard figures.
//!
//! Revenue only counts point-of-sale orders: guest orders are handed off
//! for manual fulfilment and may never be paid. Order counts and product
//! popularity still include both modes.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    entity::{
        orders::{Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products},
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderType, Product},
    response::{ApiResponse, Meta},
    routes::params::DashboardQuery,
    services::{catalog_service::product_from_entity, order_service::hydrate},
    state::AppState,
};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;
const TOP_PRODUCTS: i64 = 5;
const RECENT_ORDERS: u64 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TimeFilter {
    #[default]
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "year")]
    Year,
    #[serde(rename = "all")]
    All,
}

/// Local midnight of `date` in `tz`. Where midnight is skipped by a DST
/// change the first existing instant of the day is used.
fn local_midnight(date: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            (1..=2)
                .map(|hours| midnight + chrono::Duration::hours(hours))
                .find_map(|shifted| tz.from_local_datetime(&shifted).earliest())
        })
        .map(|local| local.with_timezone(&Utc))
}

/// Start of the range in the store timezone. `None` means unbounded; the end
/// is always `now`.
pub fn range_start(filter: TimeFilter, now: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
    let today = now.with_timezone(&tz).date_naive();
    let start = match filter {
        TimeFilter::All => return None,
        TimeFilter::Today => today,
        TimeFilter::Week => today.checked_sub_days(Days::new(u64::from(
            today.weekday().num_days_from_sunday(),
        )))?,
        TimeFilter::Month => today.with_day(1)?,
        TimeFilter::SixMonths => {
            let months = today.year() * 12 + today.month0() as i32 - 5;
            NaiveDate::from_ymd_opt(months.div_euclid(12), months.rem_euclid(12) as u32 + 1, 1)?
        }
        TimeFilter::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1)?,
    };
    local_midnight(start, tz)
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema, sqlx::FromRow)]
pub struct ProductPopularity {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SalesSummary {
    pub total_revenue: Decimal,
    pub total_orders: i64,
    pub avg_order_value: Decimal,
    pub most_ordered: Vec<ProductPopularity>,
}

/// Revenue spread over every order in range, guest orders included.
pub fn average_order_value(total_revenue: Decimal, total_orders: i64) -> Decimal {
    if total_orders <= 0 {
        return Decimal::ZERO;
    }
    (total_revenue / Decimal::from(total_orders)).round_dp(2)
}

/// Order count, point-of-sale revenue and the most ordered products between
/// `from` (unbounded when `None`) and `to`, aggregated in the database.
pub async fn sales_summary(
    pool: &DbPool,
    from: Option<DateTime<Utc>>,
    to: DateTime<Utc>,
) -> AppResult<SalesSummary> {
    let (total_orders, total_revenue): (i64, Decimal) = sqlx::query_as(
        r#"
        SELECT COUNT(*)::BIGINT,
               COALESCE(SUM(total) FILTER (WHERE order_type = $3), 0)
        FROM orders
        WHERE created_at <= $1
          AND ($2::TIMESTAMPTZ IS NULL OR created_at >= $2)
        "#,
    )
    .bind(to)
    .bind(from)
    .bind(OrderType::PointOfSale.as_str())
    .fetch_one(pool)
    .await?;

    // Ties go to the product ordered most recently; its latest name wins.
    let most_ordered: Vec<ProductPopularity> = sqlx::query_as(
        r#"
        SELECT oi.product_id,
               (ARRAY_AGG(oi.name ORDER BY o.created_at DESC, oi.position))[1] AS name,
               SUM(oi.quantity)::BIGINT AS quantity
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        WHERE o.created_at <= $1
          AND ($2::TIMESTAMPTZ IS NULL OR o.created_at >= $2)
        GROUP BY oi.product_id
        ORDER BY quantity DESC, MAX(o.created_at) DESC, oi.product_id
        LIMIT $3
        "#,
    )
    .bind(to)
    .bind(from)
    .bind(TOP_PRODUCTS)
    .fetch_all(pool)
    .await?;

    Ok(SalesSummary {
        total_revenue,
        total_orders,
        avg_order_value: average_order_value(total_revenue, total_orders),
        most_ordered,
    })
}

/// The newest `limit` orders of one mode in range, with their lines.
pub async fn recent_orders<C>(
    conn: &C,
    order_type: OrderType,
    from: Option<DateTime<Utc>>,
    to: DateTime<Utc>,
    limit: u64,
) -> AppResult<Vec<Order>>
where
    C: ConnectionTrait,
{
    let mut finder = Orders::find()
        .filter(OrderCol::OrderType.eq(order_type.as_str()))
        .filter(OrderCol::CreatedAt.lte(to));
    if let Some(from) = from {
        finder = finder.filter(OrderCol::CreatedAt.gte(from));
    }
    let models = finder
        .order_by_desc(OrderCol::CreatedAt)
        .limit(limit)
        .all(conn)
        .await?;
    hydrate(conn, models).await
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Dashboard {
    pub range: TimeFilter,
    pub from: Option<DateTime<Utc>>,
    pub to: DateTime<Utc>,
    pub summary: SalesSummary,
    pub low_stock: Vec<Product>,
    pub recent_counter_orders: Vec<Order>,
    pub recent_guest_orders: Vec<Order>,
}

pub async fn dashboard(
    state: &AppState,
    user: &AuthUser,
    query: DashboardQuery,
) -> AppResult<ApiResponse<Dashboard>> {
    ensure_admin(user)?;

    let range = query.range.unwrap_or_default();
    let threshold = query
        .low_stock_threshold
        .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD)
        .max(1);
    let now = Utc::now();
    let from = range_start(range, now, state.config.timezone);

    let summary = sales_summary(&state.pool, from, now).await?;
    let recent_counter_orders =
        recent_orders(&state.orm, OrderType::PointOfSale, from, now, RECENT_ORDERS).await?;
    let recent_guest_orders =
        recent_orders(&state.orm, OrderType::Guest, from, now, RECENT_ORDERS).await?;

    let low_stock = Products::find()
        .filter(ProdCol::Stock.gt(0))
        .filter(ProdCol::Stock.lte(threshold))
        .order_by_asc(ProdCol::Stock)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    tracing::debug!(range = ?range, orders = summary.total_orders, "dashboard computed");

    let data = Dashboard {
        range,
        from,
        to: now,
        summary,
        low_stock,
        recent_counter_orders,
        recent_guest_orders,
    };

    Ok(ApiResponse::success("Dashboard", data, Some(Meta::empty())))
}
