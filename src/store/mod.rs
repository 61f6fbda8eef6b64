//! Persistence seam for order placement.
//!
//! [`OrderStore`] hands out [`StockTransaction`]s: a read-check-write unit
//! over product stock and order records that commits or aborts as a whole.
//! Stock is only ever mutated inside such a transaction.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{NewOrder, Order, ProductRef, StockRecord};

pub use memory::MemoryOrderStore;
pub use postgres::PgOrderStore;

/// Largest amount an order total or line price column can hold
/// (`NUMERIC(12, 2)`).
pub fn max_recorded_amount() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Lost a race with another transaction; the whole unit may be retried.
    #[error("transaction conflict")]
    Conflict,

    /// The data itself was refused, e.g. a total too large for its column.
    /// Retrying the same order cannot succeed.
    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict)
    }
}

#[async_trait]
pub trait StockTransaction: Send {
    /// Reads and locks the stock record. `None` when the product is gone.
    async fn read_stock(&mut self, product: &ProductRef) -> Result<Option<StockRecord>, StoreError>;

    async fn write_stock(&mut self, product: &ProductRef, new_stock: i32) -> Result<(), StoreError>;

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StockTransaction>, StoreError>;

    /// Persists an order on its own, without touching stock.
    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError>;
}
