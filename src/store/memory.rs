use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{OrderStore, StockTransaction, StoreError, max_recorded_amount};
use crate::models::{NewOrder, Order, ProductRef, StockRecord};

#[derive(Debug, Default)]
struct MemoryState {
    products: HashMap<ProductRef, StockRecord>,
    orders: Vec<Order>,
    unavailable: bool,
    pending_conflicts: u32,
}

/// In-process order store. A transaction holds the whole store lock until
/// it finishes, so transactions are serialized.
#[derive(Clone, Default)]
pub struct MemoryOrderStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_product(&self, reference: ProductRef, name: impl Into<String>, stock: i32) {
        let record = StockRecord {
            reference: reference.clone(),
            name: name.into(),
            stock,
        };
        self.state.lock().await.products.insert(reference, record);
    }

    pub async fn stock_of(&self, reference: &ProductRef) -> Option<i32> {
        self.state
            .lock()
            .await
            .products
            .get(reference)
            .map(|record| record.stock)
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.state.lock().await.orders.clone()
    }

    /// Makes every subsequent call fail as if the backend were unreachable.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// The next `count` commits fail with [`StoreError::Conflict`].
    pub async fn inject_conflicts(&self, count: u32) {
        self.state.lock().await.pending_conflicts = count;
    }
}

fn materialize(order: NewOrder) -> Result<Order, StoreError> {
    let limit = max_recorded_amount();
    if order.total > limit || order.items.iter().any(|item| item.price > limit) {
        return Err(StoreError::Rejected(
            "an amount is too large to record".into(),
        ));
    }
    let (cashier_id, cashier_name) = match order.operator {
        Some(operator) => (Some(operator.id), Some(operator.display_name)),
        None => (None, None),
    };
    Ok(Order {
        id: Uuid::new_v4(),
        customer_name: order.customer_name,
        items: order.items,
        total: order.total,
        created_at: Utc::now(),
        order_type: order.order_type,
        cashier_id,
        cashier_name,
    })
}

pub struct MemoryTransaction {
    state: OwnedMutexGuard<MemoryState>,
    staged_stock: HashMap<ProductRef, i32>,
    staged_orders: Vec<Order>,
}

#[async_trait]
impl StockTransaction for MemoryTransaction {
    async fn read_stock(&mut self, product: &ProductRef) -> Result<Option<StockRecord>, StoreError> {
        let record = self.state.products.get(product).cloned().map(|mut record| {
            if let Some(staged) = self.staged_stock.get(product) {
                record.stock = *staged;
            }
            record
        });
        Ok(record)
    }

    async fn write_stock(&mut self, product: &ProductRef, new_stock: i32) -> Result<(), StoreError> {
        if !self.state.products.contains_key(product) {
            return Err(StoreError::Unavailable(format!("no stock record for {product}")));
        }
        if new_stock < 0 {
            return Err(StoreError::Unavailable(format!(
                "stock for {product} cannot go negative"
            )));
        }
        self.staged_stock.insert(product.clone(), new_stock);
        Ok(())
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError> {
        let order = materialize(order)?;
        self.staged_orders.push(order.clone());
        Ok(order)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction {
            mut state,
            staged_stock,
            staged_orders,
        } = *self;

        if state.pending_conflicts > 0 {
            state.pending_conflicts -= 1;
            return Err(StoreError::Conflict);
        }

        for (reference, stock) in staged_stock {
            if let Some(record) = state.products.get_mut(&reference) {
                record.stock = stock;
            }
        }
        state.orders.extend(staged_orders);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn begin(&self) -> Result<Box<dyn StockTransaction>, StoreError> {
        let state = Arc::clone(&self.state).lock_owned().await;
        if state.unavailable {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(Box::new(MemoryTransaction {
            state,
            staged_stock: HashMap::new(),
            staged_orders: Vec::new(),
        }))
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut state = self.state.lock().await;
        if state.unavailable {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        let order = materialize(order)?;
        state.orders.push(order.clone());
        Ok(order)
    }
}
