//! Session-scoped shopping cart.
//!
//! [`Cart`] is a plain state machine over line items: no I/O, no failure
//! modes. Every retained line has `quantity >= 1` and at most one line exists
//! per product id. [`CartSessions`] keeps one cart per browsing session.

mod sessions;

pub use sessions::{CartSession, CartSessions};

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{OrderItem, Product, ProductRef};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CartLineItem {
    pub reference: ProductRef,
    pub product: Product,
    pub quantity: i32,
}

impl CartLineItem {
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }

    pub fn to_order_item(&self) -> OrderItem {
        OrderItem {
            product_id: self.product.id.clone(),
            name: self.product.name.clone(),
            price: self.product.price,
            quantity: self.quantity,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, product_id: &str) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.product.id == product_id)
    }

    /// Bumps the existing line for `product.id`, or appends a new one with
    /// quantity 1 holding a snapshot of `product`.
    pub fn add_or_increment(&mut self, product: &Product) {
        match self.items.iter_mut().find(|item| item.product.id == product.id) {
            Some(item) => item.quantity = item.quantity.saturating_add(1),
            None => self.items.push(CartLineItem {
                reference: product.reference(),
                product: product.clone(),
                quantity: 1,
            }),
        }
    }

    /// Decrements the line, dropping it instead of letting it reach zero.
    pub fn decrease_or_remove(&mut self, product_id: &str) {
        match self.items.iter_mut().find(|item| item.product.id == product_id) {
            Some(item) if item.quantity > 1 => item.quantity -= 1,
            _ => self.remove(product_id),
        }
    }

    pub fn remove(&mut self, product_id: &str) {
        self.items.retain(|item| item.product.id != product_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn total(&self) -> Decimal {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }

    /// Order lines for the current contents, in cart order.
    pub fn order_items(&self) -> Vec<OrderItem> {
        self.items.iter().map(CartLineItem::to_order_item).collect()
    }
}
