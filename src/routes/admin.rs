use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        auth::CreateOperatorRequest,
        orders::OrderList,
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Order, Product, User},
    response::ApiResponse,
    routes::params::{DashboardQuery, OrderListQuery, parse_category},
    services::{
        analytics_service::{self, Dashboard},
        auth_service, order_service, product_service,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products/{category}", get(list_products).post(create_product))
        .route(
            "/products/{category}/{id}",
            patch(update_product).delete(delete_product),
        )
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/dashboard", get(dashboard))
        .route("/operators", post(create_operator))
}

#[utoipa::path(
    get,
    path = "/api/admin/products/{category}",
    params(("category" = String, Path, description = "Category key")),
    responses(
        (status = 200, description = "All products of a category, hidden ones included", body = ApiResponse<ProductList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_products(
    State(state): State<AppState>,
    user: AuthUser,
    Path(category): Path<String>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let category = parse_category(&category)?;
    let resp = product_service::list_products(&state, &user, category).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/products/{category}",
    params(("category" = String, Path, description = "Category key")),
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Create a product", body = ApiResponse<Product>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Display order already in use")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(category): Path<String>,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let category = parse_category(&category)?;
    let resp = product_service::create_product(&state, &user, category, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/products/{category}/{id}",
    params(
        ("category" = String, Path, description = "Category key"),
        ("id" = String, Path, description = "Product ID")
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Update a product", body = ApiResponse<Product>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Display order already in use")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path((category, id)): Path<(String, String)>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let category = parse_category(&category)?;
    let resp = product_service::update_product(&state, &user, category, &id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/products/{category}/{id}",
    params(
        ("category" = String, Path, description = "Category key"),
        ("id" = String, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Delete a product"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path((category, id)): Path<(String, String)>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let category = parse_category(&category)?;
    let resp = product_service::delete_product(&state, &user, category, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("type" = Option<String>, Query, description = "Filter by mode: guest, point-of-sale"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Orders, newest first", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "One order with its lines", body = ApiResponse<Order>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::get_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    params(
        ("range" = Option<String>, Query, description = "today, week, month, 6months, year or all; default today"),
        ("low_stock_threshold" = Option<i32>, Query, description = "Low-stock ceiling, default 5")
    ),
    responses(
        (status = 200, description = "Sales figures for the range", body = ApiResponse<Dashboard>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<ApiResponse<Dashboard>>> {
    let resp = analytics_service::dashboard(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/operators",
    request_body = CreateOperatorRequest,
    responses(
        (status = 200, description = "Create an admin or cashier account", body = ApiResponse<User>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_operator(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOperatorRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = auth_service::create_operator(&state, &user, payload).await?;
    Ok(Json(resp))
}
