use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Category, Product};

#[derive(Debug, Serialize, ToSchema)]
pub struct CategorySection {
    pub category: Category,
    pub display_name: String,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogView {
    pub categories: Vec<CategorySection>,
}
