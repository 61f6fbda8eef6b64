use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, QueryFilter, QuerySelect, RuntimeErr, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use uuid::Uuid;

use super::{OrderStore, StockTransaction, StoreError};
use crate::{
    entity::{
        order_items::{ActiveModel as OrderItemActive, Model as OrderItemModel},
        orders::{ActiveModel as OrderActive, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    models::{NewOrder, Order, OrderItem, ProductRef, StockRecord, UnknownOrderType},
};

// Postgres SQLSTATEs for serialization failure and detected deadlock.
const RETRYABLE_SQLSTATES: [&str; 2] = ["40001", "40P01"];
// numeric_value_out_of_range
const OUT_OF_RANGE_SQLSTATE: &str = "22003";

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match sqlstate(&err).as_deref() {
            Some(code) if RETRYABLE_SQLSTATES.contains(&code) => StoreError::Conflict,
            Some(OUT_OF_RANGE_SQLSTATE) => {
                StoreError::Rejected("an amount is too large to record".into())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

fn sqlstate(err: &DbErr) -> Option<String> {
    let runtime = match err {
        DbErr::Exec(runtime) | DbErr::Query(runtime) | DbErr::Conn(runtime) => runtime,
        _ => return None,
    };
    match runtime {
        RuntimeErr::SqlxError(err) => err
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code.into_owned()),
        _ => None,
    }
}

/// Order store backed by Postgres through sea-orm.
///
/// Stock reads take a row lock (`SELECT … FOR UPDATE`), so concurrent
/// point-of-sale transactions touching the same product queue up behind each
/// other and re-read the committed stock.
#[derive(Clone)]
pub struct PgOrderStore {
    orm: DatabaseConnection,
}

impl PgOrderStore {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }
}

pub struct PgStockTransaction {
    txn: DatabaseTransaction,
}

#[async_trait]
impl StockTransaction for PgStockTransaction {
    async fn read_stock(&mut self, product: &ProductRef) -> Result<Option<StockRecord>, StoreError> {
        let row = Products::find_by_id((
            product.category.as_str().to_string(),
            product.product_id.clone(),
        ))
        .lock(LockType::Update)
        .one(&self.txn)
        .await?;

        Ok(row.map(|row| StockRecord {
            reference: product.clone(),
            name: row.name,
            stock: row.stock,
        }))
    }

    async fn write_stock(&mut self, product: &ProductRef, new_stock: i32) -> Result<(), StoreError> {
        let result = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::value(new_stock))
            .col_expr(ProdCol::UpdatedAt, Expr::value(Utc::now()))
            .filter(ProdCol::Category.eq(product.category.as_str()))
            .filter(ProdCol::Id.eq(product.product_id.as_str()))
            .exec(&self.txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::Unavailable(format!(
                "no stock record for {product}"
            )));
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError> {
        insert_order_rows(&self.txn, order).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn begin(&self) -> Result<Box<dyn StockTransaction>, StoreError> {
        let txn = self.orm.begin().await?;
        Ok(Box::new(PgStockTransaction { txn }))
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let txn = self.orm.begin().await?;
        let order = insert_order_rows(&txn, order).await?;
        txn.commit().await?;
        Ok(order)
    }
}

async fn insert_order_rows<C>(conn: &C, order: NewOrder) -> Result<Order, StoreError>
where
    C: ConnectionTrait,
{
    let NewOrder {
        customer_name,
        items,
        total,
        order_type,
        operator,
    } = order;

    let (cashier_id, cashier_name) = match operator {
        Some(operator) => (Some(operator.id), Some(operator.display_name)),
        None => (None, None),
    };

    let order_model = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_name: Set(customer_name),
        total: Set(total),
        order_type: Set(order_type.as_str().to_string()),
        cashier_id: Set(cashier_id),
        cashier_name: Set(cashier_name),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;

    let mut item_models = Vec::with_capacity(items.len());
    for (position, item) in items.into_iter().enumerate() {
        let position = i32::try_from(position)
            .map_err(|_| StoreError::Unavailable("order has too many lines".into()))?;
        let model = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_model.id),
            position: Set(position),
            product_id: Set(item.product_id),
            name: Set(item.name),
            price: Set(item.price),
            quantity: Set(item.quantity),
        }
        .insert(conn)
        .await?;
        item_models.push(model);
    }

    order_from_entity(order_model, item_models)
        .map_err(|err| StoreError::Unavailable(err.to_string()))
}

/// Rebuilds an order from its rows. `items` may arrive in any order.
pub(crate) fn order_from_entity(
    model: OrderModel,
    mut items: Vec<OrderItemModel>,
) -> Result<Order, UnknownOrderType> {
    items.sort_by_key(|item| item.position);
    Ok(Order {
        id: model.id,
        customer_name: model.customer_name,
        items: items
            .into_iter()
            .map(|item| OrderItem {
                product_id: item.product_id,
                name: item.name,
                price: item.price,
                quantity: item.quantity,
            })
            .collect(),
        total: model.total,
        created_at: model.created_at.with_timezone(&Utc),
        order_type: model.order_type.parse()?,
        cashier_id: model.cashier_id,
        cashier_name: model.cashier_name,
    })
}
