use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::{catalog::CatalogView, products::ProductList},
    error::AppResult,
    response::ApiResponse,
    routes::params::parse_category,
    services::catalog_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog))
        .route("/{category}", get(category_products))
}

#[utoipa::path(
    get,
    path = "/api/catalog",
    responses(
        (status = 200, description = "Visible products grouped by category", body = ApiResponse<CatalogView>)
    ),
    tag = "Catalog"
)]
pub async fn catalog(State(state): State<AppState>) -> AppResult<Json<ApiResponse<CatalogView>>> {
    let resp = catalog_service::catalog(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/catalog/{category}",
    params(
        ("category" = String, Path, description = "Category key, e.g. snack-attack")
    ),
    responses(
        (status = 200, description = "Visible products of one category", body = ApiResponse<ProductList>),
        (status = 400, description = "Unknown category")
    ),
    tag = "Catalog"
)]
pub async fn category_products(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let category = parse_category(&category)?;
    let resp = catalog_service::category_products(&state, category).await?;
    Ok(Json(resp))
}
