use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Order;

#[derive(Debug, Deserialize, ToSchema)]
pub struct GuestCheckoutRequest {
    pub customer_name: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CounterCheckoutRequest {
    /// Defaults to `In-Store Customer` when missing or blank.
    pub customer_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
