mod common;

use common::{insert_admin, insert_product, stock_of};
use pip_beach_plug::{
    cart::Cart,
    dto::products::CreateProductRequest,
    error::AppError,
    models::{Category, Operator, OrderType},
    services::{
        checkout_service::{CheckoutError, place_counter_order, place_guest_order},
        product_service,
    },
    state::AppState,
};
use rust_decimal::Decimal;
use uuid::Uuid;

async fn orders_named(state: &AppState, customer_name: &str) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE customer_name = $1")
        .bind(customer_name)
        .fetch_one(&state.pool)
        .await?;
    Ok(count)
}

fn cashier() -> Operator {
    Operator {
        id: Uuid::new_v4().to_string(),
        display_name: "Test Cashier".into(),
    }
}

#[tokio::test]
async fn counter_sale_rolls_back_when_any_line_is_short() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::database_state(&url).await?;

    let a = insert_product(&state, Category::Smokes, 30, 5).await?;
    let b = insert_product(&state, Category::Smokes, 10, 1).await?;

    let mut cart = Cart::new();
    cart.add_or_increment(&a);
    cart.add_or_increment(&a);
    for _ in 0..3 {
        cart.add_or_increment(&b);
    }
    let customer = format!("rollback-{}", Uuid::new_v4());

    let err = place_counter_order(state.store.as_ref(), &mut cart, Some(&customer), &cashier(), 3)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::InsufficientStock { .. }));
    assert_eq!(stock_of(&state, &a).await?, 5);
    assert_eq!(stock_of(&state, &b).await?, 1);
    assert_eq!(orders_named(&state, &customer).await?, 0);
    assert_eq!(cart.item_count(), 5);
    Ok(())
}

#[tokio::test]
async fn counter_sale_commits_stock_and_order() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::database_state(&url).await?;

    let a = insert_product(&state, Category::SnackAttack, 30, 5).await?;
    let b = insert_product(&state, Category::SnackAttack, 10, 4).await?;

    let mut cart = Cart::new();
    cart.add_or_increment(&a);
    cart.add_or_increment(&a);
    cart.add_or_increment(&b);
    let customer = format!("commit-{}", Uuid::new_v4());
    let operator = cashier();

    let order = place_counter_order(state.store.as_ref(), &mut cart, Some(&customer), &operator, 3)
        .await?;

    assert_eq!(stock_of(&state, &a).await?, 3);
    assert_eq!(stock_of(&state, &b).await?, 3);
    assert_eq!(order.total, Decimal::new(70, 0));
    assert_eq!(order.order_type, OrderType::PointOfSale);
    assert_eq!(order.cashier_id.as_deref(), Some(operator.id.as_str()));
    assert_eq!(order.items[0].product_id, a.id);
    assert_eq!(order.items[1].product_id, b.id);
    assert_eq!(orders_named(&state, &customer).await?, 1);
    assert!(cart.is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_counter_sales_never_oversell() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::database_state(&url).await?;

    let scarce = insert_product(&state, Category::CandyBoom, 12, 3).await?;

    let mut first = Cart::new();
    let mut second = Cart::new();
    for _ in 0..2 {
        first.add_or_increment(&scarce);
        second.add_or_increment(&scarce);
    }
    let operator = cashier();

    let (left, right) = tokio::join!(
        place_counter_order(state.store.as_ref(), &mut first, None, &operator, 3),
        place_counter_order(state.store.as_ref(), &mut second, None, &operator, 3),
    );

    let placed = [&left, &right].iter().filter(|r| r.is_ok()).count();
    assert_eq!(placed, 1);
    let failure = if left.is_err() { left } else { right };
    assert!(matches!(
        failure,
        Err(CheckoutError::InsufficientStock { available: 1, .. })
    ));
    assert_eq!(stock_of(&state, &scarce).await?, 1);
    Ok(())
}

#[tokio::test]
async fn guest_order_is_recorded_without_stock() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::database_state(&url).await?;

    let sold_out = insert_product(&state, Category::SuperNuts, 45, 0).await?;

    let mut cart = Cart::new();
    cart.add_or_increment(&sold_out);
    let customer = format!("guest-{}", Uuid::new_v4());

    let receipt = place_guest_order(
        state.store.as_ref(),
        &mut cart,
        &customer,
        &state.config.hand_off,
    )
    .await?;

    assert_eq!(receipt.order.order_type, OrderType::Guest);
    assert!(receipt.hand_off.url.starts_with("https://wa.me/201019284462?text="));
    assert_eq!(stock_of(&state, &sold_out).await?, 0);
    assert_eq!(orders_named(&state, &customer).await?, 1);
    assert!(cart.is_empty());
    Ok(())
}

#[tokio::test]
async fn display_order_is_allocated_and_guarded() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::database_state(&url).await?;

    let admin = insert_admin(&state).await?;

    let request = |display_order| CreateProductRequest {
        name: "Test Cards".into(),
        price: Decimal::new(50, 0),
        image_url: String::new(),
        stock: 2,
        display_order,
        is_available: true,
        is_visible: true,
    };

    let first = product_service::create_product(&state, &admin, Category::GameOn, request(None))
        .await?
        .data
        .expect("created product");
    let (max,): (i32,) =
        sqlx::query_as("SELECT MAX(display_order) FROM products WHERE category = $1")
            .bind(Category::GameOn.as_str())
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(first.display_order, max);

    let err = product_service::create_product(
        &state,
        &admin,
        Category::GameOn,
        request(Some(first.display_order)),
    )
    .await
    .err()
    .expect("collision");
    assert!(matches!(err, AppError::Conflict(ref msg) if msg.contains("already in use")));
    Ok(())
}

#[tokio::test]
async fn oversized_order_is_rejected_without_side_effects() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::database_state(&url).await?;

    // Fits a price column; two of them do not fit an order total.
    let pricey = insert_product(&state, Category::VibeSave, 9_999_999_999, 5).await?;

    let mut cart = Cart::new();
    cart.add_or_increment(&pricey);
    cart.add_or_increment(&pricey);
    let customer = format!("oversized-{}", Uuid::new_v4());

    let err = place_counter_order(state.store.as_ref(), &mut cart, Some(&customer), &cashier(), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Validation(_)));
    assert_eq!(stock_of(&state, &pricey).await?, 5);

    let err = place_guest_order(state.store.as_ref(), &mut cart, &customer, &state.config.hand_off)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Validation(_)));

    assert_eq!(orders_named(&state, &customer).await?, 0);
    assert_eq!(cart.item_count(), 2);
    Ok(())
}
