use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::{
    dto::{
        catalog::{CatalogView, CategorySection},
        products::ProductList,
    },
    entity::products::{Column, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    models::{Category, Product, ProductRef},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub(crate) fn product_from_entity(model: ProductModel) -> AppResult<Product> {
    let category = model
        .category
        .parse::<Category>()
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(Product {
        id: model.id,
        category,
        name: model.name,
        price: model.price,
        image_url: model.image_url,
        is_available: model.is_available,
        is_visible: model.is_visible,
        display_order: model.display_order,
        stock: model.stock,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

/// Products of one category by display order, optionally only the visible
/// ones.
pub async fn list_category<C>(
    conn: &C,
    category: Category,
    visible_only: bool,
) -> AppResult<Vec<Product>>
where
    C: ConnectionTrait,
{
    let mut finder = Products::find().filter(Column::Category.eq(category.as_str()));
    if visible_only {
        finder = finder.filter(Column::IsVisible.eq(true));
    }

    finder
        .order_by_asc(Column::DisplayOrder)
        .all(conn)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect()
}

pub async fn find_product<C>(conn: &C, product: &ProductRef) -> AppResult<Option<Product>>
where
    C: ConnectionTrait,
{
    Products::find_by_id((
        product.category.as_str().to_string(),
        product.product_id.clone(),
    ))
    .one(conn)
    .await?
    .map(product_from_entity)
    .transpose()
}

pub async fn catalog(state: &AppState) -> AppResult<ApiResponse<CatalogView>> {
    let mut categories = Vec::new();
    for category in Category::ALL {
        let products = list_category(&state.orm, category, true).await?;
        if products.is_empty() {
            continue;
        }
        categories.push(CategorySection {
            category,
            display_name: category.display_name(),
            products,
        });
    }

    Ok(ApiResponse::success(
        "Catalog",
        CatalogView { categories },
        Some(Meta::empty()),
    ))
}

pub async fn category_products(
    state: &AppState,
    category: Category,
) -> AppResult<ApiResponse<ProductList>> {
    let items = list_category(&state.orm, category, true).await?;
    let meta = Meta::unpaged(items.len());
    Ok(ApiResponse::success(
        category.display_name(),
        ProductList { items },
        Some(meta),
    ))
}
