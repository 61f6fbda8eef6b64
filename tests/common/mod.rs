#![allow(dead_code)]

use std::time::Duration;

use chrono::Utc;
use pip_beach_plug::{
    config::{AppConfig, HandOffConfig},
    db::run_migrations,
    entity::products::ActiveModel as ProductActive,
    middleware::auth::{AuthUser, ROLE_ADMIN},
    models::{Category, Product},
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

pub fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        hand_off: HandOffConfig {
            store_name: "Pip Beach Plug".into(),
            currency: "EGP".into(),
            phone: "201019284462".into(),
            base_url: "https://wa.me".into(),
        },
        timezone: chrono_tz::Africa::Cairo,
        checkout_max_attempts: 3,
        cart_idle_ttl: Duration::from_secs(7200),
    }
}

/// State whose pool never connects; fine for handlers that stay in memory.
pub fn offline_state() -> AppState {
    let url = "postgres://offline@localhost:1/unused";
    let pool = PgPoolOptions::new()
        .connect_lazy(url)
        .expect("lazy pool");
    AppState::new(pool, test_config(url))
}

pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run database tests.");
            None
        }
    }
}

pub async fn database_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    run_migrations(&pool).await?;
    Ok(AppState::new(pool, test_config(database_url)))
}

pub struct ProductSeed {
    pub category: Category,
    pub price: Decimal,
    pub stock: i32,
    pub is_visible: bool,
    pub is_available: bool,
}

impl ProductSeed {
    pub fn new(category: Category, price: i64, stock: i32) -> Self {
        Self {
            category,
            price: Decimal::new(price, 0),
            stock,
            is_visible: true,
            is_available: true,
        }
    }
}

/// Inserts a product with a fresh id in the next free display slot.
pub async fn insert_product_with(state: &AppState, seed: ProductSeed) -> anyhow::Result<Product> {
    let id = Uuid::new_v4().to_string();
    let (next,): (i32,) = sqlx::query_as(
        "SELECT COALESCE(MAX(display_order), 0) + 1 FROM products WHERE category = $1",
    )
    .bind(seed.category.as_str())
    .fetch_one(&state.pool)
    .await?;

    let now = Utc::now();
    ProductActive {
        category: Set(seed.category.as_str().to_string()),
        id: Set(id.clone()),
        name: Set(format!("Test {id}")),
        price: Set(seed.price),
        image_url: Set(String::new()),
        is_available: Set(seed.is_available),
        is_visible: Set(seed.is_visible),
        display_order: Set(next),
        stock: Set(seed.stock),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(Product {
        id: id.clone(),
        category: seed.category,
        name: format!("Test {id}"),
        price: seed.price,
        image_url: String::new(),
        is_available: seed.is_available,
        is_visible: seed.is_visible,
        display_order: next,
        stock: seed.stock,
        created_at: now,
        updated_at: now,
    })
}

pub async fn insert_product(
    state: &AppState,
    category: Category,
    price: i64,
    stock: i32,
) -> anyhow::Result<Product> {
    insert_product_with(state, ProductSeed::new(category, price, stock)).await
}

pub async fn stock_of(state: &AppState, product: &Product) -> anyhow::Result<i32> {
    let (stock,): (i32,) =
        sqlx::query_as("SELECT stock FROM products WHERE category = $1 AND id = $2")
            .bind(product.category.as_str())
            .bind(&product.id)
            .fetch_one(&state.pool)
            .await?;
    Ok(stock)
}

/// Stores an admin account so audit rows can reference it.
pub async fn insert_admin(state: &AppState) -> anyhow::Result<AuthUser> {
    let admin_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, email, display_name, password_hash, role) VALUES ($1, $2, 'Admin', 'x', 'admin')",
    )
    .bind(admin_id)
    .bind(format!("{admin_id}@pip.test"))
    .execute(&state.pool)
    .await?;
    Ok(AuthUser {
        user_id: admin_id,
        role: ROLE_ADMIN.into(),
        name: "Admin".into(),
    })
}
