use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    cart::{Cart, CartLineItem},
    models::Category,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub category: Category,
    pub product_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub id: Uuid,
    pub items: Vec<CartLineItem>,
    pub total: Decimal,
    pub item_count: i64,
}

impl CartView {
    pub fn new(id: Uuid, cart: &Cart) -> Self {
        Self {
            id,
            items: cart.items().to_vec(),
            total: cart.total(),
            item_count: cart.item_count(),
        }
    }
}
