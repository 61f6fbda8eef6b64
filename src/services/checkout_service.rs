//! Turns a cart into a persisted order.
//!
//! Guest orders are recorded as-is and handed off to the messaging deep link
//! for manual fulfilment; stock is never checked for them. Point-of-sale
//! orders verify and decrement stock for every line inside one store
//! transaction, so either the whole sale commits or nothing does.
//!
//! In both modes the cart is cleared only after the store confirmed the
//! write; every failure leaves it untouched.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    cart::{Cart, CartLineItem},
    config::HandOffConfig,
    models::{NewOrder, Operator, Order, OrderItem, OrderType, ProductRef},
    store::{OrderStore, StockTransaction, StoreError},
};

pub const IN_STORE_CUSTOMER: &str = "In-Store Customer";

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("{0}")]
    Validation(String),

    #[error("Product {name} not found.")]
    ProductNotFound { product: ProductRef, name: String },

    #[error("Item {name} is out of stock.")]
    InsufficientStock {
        product: ProductRef,
        name: String,
        requested: i32,
        available: i32,
    },

    #[error("Could not place the order. Please try again.")]
    Store(#[source] StoreError),
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(reason) => CheckoutError::Validation(format!(
                "The order could not be recorded: {reason}."
            )),
            err => CheckoutError::Store(err),
        }
    }
}

/// Pre-composed message for the external messaging channel.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HandOff {
    pub destination: String,
    pub message: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GuestReceipt {
    pub order: Order,
    pub hand_off: HandOff,
}

fn display_amount(amount: Decimal) -> String {
    amount.normalize().to_string()
}

/// One `- {name} (x{qty}) - {currency} {line total}` line per item, then a
/// blank line and the bold total line.
pub fn order_summary(items: &[OrderItem], total: Decimal, currency: &str) -> String {
    let lines = items
        .iter()
        .map(|item| {
            format!(
                "- {} (x{}) - {} {}",
                item.name,
                item.quantity,
                currency,
                display_amount(item.line_total())
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("{lines}\n\n*Total: {currency} {}*", display_amount(total))
}

pub fn compose_hand_off(
    config: &HandOffConfig,
    customer_name: &str,
    items: &[OrderItem],
    total: Decimal,
) -> HandOff {
    let summary = order_summary(items, total, &config.currency);
    let message = format!(
        "Hello {}! I'd like to place an order:\n\n*Customer Details:*\nName: {}\n\n*Order Summary:*\n{}\n\nThank you!",
        config.store_name, customer_name, summary
    );
    let url = format!(
        "{}/{}?text={}",
        config.base_url.trim_end_matches('/'),
        config.phone,
        urlencoding::encode(&message)
    );
    HandOff {
        destination: config.phone.clone(),
        message,
        url,
    }
}

/// Records a guest order without looking at stock, then clears the cart and
/// returns the hand-off payload.
pub async fn place_guest_order(
    store: &dyn OrderStore,
    cart: &mut Cart,
    customer_name: &str,
    hand_off: &HandOffConfig,
) -> Result<GuestReceipt, CheckoutError> {
    let customer_name = customer_name.trim();
    if customer_name.is_empty() {
        return Err(CheckoutError::Validation(
            "customer name is required".to_string(),
        ));
    }
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let new_order = NewOrder {
        customer_name: customer_name.to_string(),
        items: cart.order_items(),
        total: cart.total(),
        order_type: OrderType::Guest,
        operator: None,
    };

    let order = store.create_order(new_order).await.inspect_err(|err| {
        tracing::error!(error = %err, "guest order could not be recorded");
    })?;

    let hand_off = compose_hand_off(hand_off, &order.customer_name, &order.items, order.total);
    cart.clear();

    tracing::info!(
        order_id = %order.id,
        total = %order.total,
        lines = order.items.len(),
        "guest order placed"
    );

    Ok(GuestReceipt { order, hand_off })
}

/// Sells the cart at the counter: checks and decrements stock for every line
/// and records the order in one transaction. Conflicts are retried up to
/// `max_attempts` times in total.
pub async fn place_counter_order(
    store: &dyn OrderStore,
    cart: &mut Cart,
    customer_name: Option<&str>,
    operator: &Operator,
    max_attempts: u32,
) -> Result<Order, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let customer_name = customer_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(IN_STORE_CUSTOMER);

    let new_order = NewOrder {
        customer_name: customer_name.to_string(),
        items: cart.order_items(),
        total: cart.total(),
        order_type: OrderType::PointOfSale,
        operator: Some(operator.clone()),
    };

    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    let order = loop {
        match attempt_counter_sale(store, cart.items(), new_order.clone()).await {
            Ok(order) => break order,
            Err(CheckoutError::Store(err)) if err.is_retryable() && attempt < max_attempts => {
                tracing::warn!(attempt, max_attempts, "counter sale conflicted, retrying");
                attempt += 1;
            }
            Err(err) => {
                match &err {
                    CheckoutError::Store(store_err) => {
                        tracing::error!(error = %store_err, attempt, "counter sale failed")
                    }
                    other => tracing::warn!(reason = %other, "counter sale aborted"),
                }
                return Err(err);
            }
        }
    };

    cart.clear();

    tracing::info!(
        order_id = %order.id,
        total = %order.total,
        cashier_id = %operator.id,
        attempt,
        "counter sale completed"
    );

    Ok(order)
}

async fn attempt_counter_sale(
    store: &dyn OrderStore,
    lines: &[CartLineItem],
    new_order: NewOrder,
) -> Result<Order, CheckoutError> {
    let mut txn = store.begin().await?;
    match stage_counter_sale(txn.as_mut(), lines, new_order).await {
        Ok(order) => {
            txn.commit().await?;
            Ok(order)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

async fn stage_counter_sale(
    txn: &mut dyn StockTransaction,
    lines: &[CartLineItem],
    new_order: NewOrder,
) -> Result<Order, CheckoutError> {
    // Every line is checked before anything is written; the first failing
    // line decides the error.
    let mut remaining = Vec::with_capacity(lines.len());
    for line in lines {
        let record = txn.read_stock(&line.reference).await?.ok_or_else(|| {
            CheckoutError::ProductNotFound {
                product: line.reference.clone(),
                name: line.product.name.clone(),
            }
        })?;

        if record.stock < line.quantity {
            return Err(CheckoutError::InsufficientStock {
                product: line.reference.clone(),
                name: line.product.name.clone(),
                requested: line.quantity,
                available: record.stock,
            });
        }
        remaining.push((&line.reference, record.stock - line.quantity));
    }

    for (reference, stock) in remaining {
        txn.write_stock(reference, stock).await?;
    }

    Ok(txn.insert_order(new_order).await?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{cart::tests::product, models::Category, store::MemoryOrderStore};

    fn hand_off_config() -> HandOffConfig {
        HandOffConfig {
            store_name: "Pip Beach Plug".into(),
            currency: "EGP".into(),
            phone: "201019284462".into(),
            base_url: "https://wa.me".into(),
        }
    }

    fn cashier() -> Operator {
        Operator {
            id: "cashier-1".into(),
            display_name: "Salma".into(),
        }
    }

    async fn stocked(store: &MemoryOrderStore, id: &str, price: i64, stock: i32) -> crate::models::Product {
        let product = product(id, Category::SnackAttack, Decimal::new(price, 0), stock);
        store
            .put_product(product.reference(), product.name.clone(), stock)
            .await;
        product
    }

    #[tokio::test]
    async fn counter_sale_is_all_or_nothing() {
        let store = MemoryOrderStore::new();
        let a = stocked(&store, "a", 30, 5).await;
        let b = stocked(&store, "b", 10, 1).await;

        let mut cart = Cart::new();
        cart.add_or_increment(&a);
        cart.add_or_increment(&a);
        for _ in 0..3 {
            cart.add_or_increment(&b);
        }
        let before = cart.clone();

        let err = place_counter_order(&store, &mut cart, None, &cashier(), 3)
            .await
            .unwrap_err();

        match err {
            CheckoutError::InsufficientStock {
                product,
                requested,
                available,
                ..
            } => {
                assert_eq!(product, b.reference());
                assert_eq!(requested, 3);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.stock_of(&a.reference()).await, Some(5));
        assert_eq!(store.stock_of(&b.reference()).await, Some(1));
        assert!(store.orders().await.is_empty());
        assert_eq!(cart, before);
    }

    #[tokio::test]
    async fn counter_sale_decrements_stock_and_records_order() {
        let store = MemoryOrderStore::new();
        let a = stocked(&store, "a", 30, 5).await;

        let mut cart = Cart::new();
        cart.add_or_increment(&a);
        cart.add_or_increment(&a);

        let order = place_counter_order(&store, &mut cart, Some("  "), &cashier(), 3)
            .await
            .unwrap();

        assert_eq!(store.stock_of(&a.reference()).await, Some(3));
        assert_eq!(store.orders().await, vec![order.clone()]);
        assert_eq!(order.total, Decimal::new(60, 0));
        assert_eq!(order.order_type, OrderType::PointOfSale);
        assert_eq!(order.customer_name, IN_STORE_CUSTOMER);
        assert_eq!(order.cashier_id.as_deref(), Some("cashier-1"));
        assert_eq!(order.cashier_name.as_deref(), Some("Salma"));
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn counter_sale_reports_missing_product() {
        let store = MemoryOrderStore::new();
        let ghost = product("ghost", Category::GameOn, Decimal::ONE, 4);

        let mut cart = Cart::new();
        cart.add_or_increment(&ghost);

        let err = place_counter_order(&store, &mut cart, Some("Omar"), &cashier(), 3)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::ProductNotFound { .. }));
        assert_eq!(err.to_string(), "Product Product ghost not found.");
        assert_eq!(cart.item_count(), 1);
    }

    #[tokio::test]
    async fn first_failing_line_decides_the_error() {
        let store = MemoryOrderStore::new();
        let short = stocked(&store, "short", 5, 0).await;
        let ghost = product("ghost", Category::GameOn, Decimal::ONE, 4);

        let mut cart = Cart::new();
        cart.add_or_increment(&short);
        cart.add_or_increment(&ghost);

        let err = place_counter_order(&store, &mut cart, None, &cashier(), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::InsufficientStock { .. }));
    }

    #[tokio::test]
    async fn counter_sale_retries_conflicts() {
        let store = MemoryOrderStore::new();
        let a = stocked(&store, "a", 30, 5).await;
        store.inject_conflicts(2).await;

        let mut cart = Cart::new();
        cart.add_or_increment(&a);

        place_counter_order(&store, &mut cart, None, &cashier(), 3)
            .await
            .unwrap();

        assert_eq!(store.stock_of(&a.reference()).await, Some(4));
        assert_eq!(store.orders().await.len(), 1);
    }

    #[tokio::test]
    async fn counter_sale_gives_up_after_max_attempts() {
        let store = MemoryOrderStore::new();
        let a = stocked(&store, "a", 30, 5).await;
        store.inject_conflicts(3).await;

        let mut cart = Cart::new();
        cart.add_or_increment(&a);

        let err = place_counter_order(&store, &mut cart, None, &cashier(), 3)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Store(StoreError::Conflict)));
        assert_eq!(store.stock_of(&a.reference()).await, Some(5));
        assert!(store.orders().await.is_empty());
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn concurrent_counter_sales_never_oversell() {
        let store = Arc::new(MemoryOrderStore::new());
        let a = stocked(&store, "a", 30, 3).await;

        let mut first = Cart::new();
        let mut second = Cart::new();
        for _ in 0..2 {
            first.add_or_increment(&a);
            second.add_or_increment(&a);
        }

        let operator = cashier();
        let (left, right) = tokio::join!(
            place_counter_order(store.as_ref(), &mut first, None, &operator, 3),
            place_counter_order(store.as_ref(), &mut second, None, &operator, 3),
        );

        assert_eq!(usize::from(left.is_ok()) + usize::from(right.is_ok()), 1);
        assert_eq!(store.stock_of(&a.reference()).await, Some(1));
        assert_eq!(store.orders().await.len(), 1);
    }

    #[tokio::test]
    async fn empty_cart_is_refused_before_io() {
        let store = MemoryOrderStore::new();
        store.set_unavailable(true).await;
        let mut cart = Cart::new();

        let counter = place_counter_order(&store, &mut cart, None, &cashier(), 3).await;
        let guest = place_guest_order(&store, &mut cart, "Mona", &hand_off_config()).await;

        assert!(matches!(counter, Err(CheckoutError::EmptyCart)));
        assert!(matches!(guest, Err(CheckoutError::EmptyCart)));
    }

    #[tokio::test]
    async fn guest_order_ignores_stock() {
        let store = MemoryOrderStore::new();
        let sold_out = stocked(&store, "sold-out", 12, 0).await;

        let mut cart = Cart::new();
        cart.add_or_increment(&sold_out);

        let receipt = place_guest_order(&store, &mut cart, " Mona ", &hand_off_config())
            .await
            .unwrap();

        assert_eq!(receipt.order.order_type, OrderType::Guest);
        assert_eq!(receipt.order.customer_name, "Mona");
        assert!(receipt.order.cashier_id.is_none());
        assert_eq!(store.orders().await.len(), 1);
        assert_eq!(store.stock_of(&sold_out.reference()).await, Some(0));
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn guest_order_requires_a_name() {
        let store = MemoryOrderStore::new();
        let a = stocked(&store, "a", 12, 1).await;
        let mut cart = Cart::new();
        cart.add_or_increment(&a);

        let err = place_guest_order(&store, &mut cart, "   ", &hand_off_config())
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Validation(_)));
        assert!(store.orders().await.is_empty());
        assert_eq!(cart.item_count(), 1);
    }

    #[tokio::test]
    async fn guest_order_failure_keeps_cart() {
        let store = MemoryOrderStore::new();
        let a = stocked(&store, "a", 12, 1).await;
        store.set_unavailable(true).await;

        let mut cart = Cart::new();
        cart.add_or_increment(&a);
        let before = cart.clone();

        let err = place_guest_order(&store, &mut cart, "Mona", &hand_off_config())
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Store(_)));
        assert_eq!(cart, before);
    }

    #[tokio::test]
    async fn oversized_total_is_rejected_not_retried() {
        let store = MemoryOrderStore::new();
        let pricey = stocked(&store, "gold", 9_999_999_999, 5).await;

        let mut cart = Cart::new();
        cart.add_or_increment(&pricey);
        cart.add_or_increment(&pricey);
        let before = cart.clone();

        let err = place_counter_order(&store, &mut cart, None, &cashier(), 3)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Validation(_)));
        assert_eq!(store.stock_of(&pricey.reference()).await, Some(5));
        assert!(store.orders().await.is_empty());
        assert_eq!(cart, before);

        let err = place_guest_order(&store, &mut cart, "Mona", &hand_off_config())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
        assert_eq!(cart, before);
    }

    #[test]
    fn summary_lists_each_line_and_total() {
        let items = vec![
            OrderItem {
                product_id: "a".into(),
                name: "Chips".into(),
                price: Decimal::new(1250, 2),
                quantity: 2,
            },
            OrderItem {
                product_id: "b".into(),
                name: "Cola".into(),
                price: Decimal::new(20, 0),
                quantity: 1,
            },
        ];

        let summary = order_summary(&items, Decimal::new(4500, 2), "EGP");

        assert_eq!(
            summary,
            "- Chips (x2) - EGP 25\n- Cola (x1) - EGP 20\n\n*Total: EGP 45*"
        );
    }

    #[test]
    fn hand_off_url_targets_configured_phone() {
        let items = vec![OrderItem {
            product_id: "a".into(),
            name: "Chips".into(),
            price: Decimal::new(25, 0),
            quantity: 1,
        }];

        let hand_off = compose_hand_off(&hand_off_config(), "Mona Ali", &items, Decimal::new(25, 0));

        assert_eq!(hand_off.destination, "201019284462");
        assert!(hand_off.message.starts_with("Hello Pip Beach Plug! I'd like to place an order:"));
        assert!(hand_off.message.contains("Name: Mona Ali"));
        assert!(hand_off.message.ends_with("Thank you!"));
        assert!(hand_off.url.starts_with("https://wa.me/201019284462?text=Hello%20Pip%20Beach%20Plug"));
        assert!(!hand_off.url.contains('\n'));
    }
}
