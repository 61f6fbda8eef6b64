use anyhow::Context;
use pip_beach_plug::{
    db::{create_pool, run_migrations},
    middleware::auth::{ROLE_ADMIN, ROLE_CASHIER},
    models::Category,
    services::auth_service::hash_password,
};
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;

    let admin_id =
        ensure_operator(&pool, "admin@pipbeachplug.test", "admin1234", "Store Admin", ROLE_ADMIN)
            .await?;
    let cashier_id = ensure_operator(
        &pool,
        "cashier@pipbeachplug.test",
        "cashier1234",
        "Front Counter",
        ROLE_CASHIER,
    )
    .await?;
    seed_products(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, Cashier ID: {cashier_id}");
    Ok(())
}

async fn ensure_operator(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    display_name: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, display_name, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE
            SET role = EXCLUDED.role, display_name = EXCLUDED.display_name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(display_name)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // (category, id, name, price in piastres, stock)
    let products = [
        (Category::Smokes, "marlboro-red", "Marlboro Red", 11500, 40),
        (Category::Smokes, "lm-blue", "L&M Blue", 8500, 25),
        (Category::SnackAttack, "chipsy-salt", "Chipsy Salt", 1500, 60),
        (Category::SnackAttack, "doritos-nacho", "Doritos Nacho", 2000, 4),
        (Category::CandyBoom, "cadbury-dairy-milk", "Cadbury Dairy Milk", 3000, 30),
        (Category::CandyBoom, "mentos-mint", "Mentos Mint", 1000, 0),
        (Category::SuperNuts, "mixed-nuts", "Mixed Nuts 200g", 9000, 12),
        (Category::VibeSave, "red-bull", "Red Bull", 6000, 48),
        (Category::VibeSave, "water-1l", "Water 1L", 1000, 100),
        (Category::GameOn, "uno", "UNO Cards", 25000, 3),
    ];

    let mut display_order = std::collections::HashMap::new();
    for (category, id, name, price, stock) in products {
        let slot = display_order.entry(category).or_insert(0_i32);
        *slot += 1;

        sqlx::query(
            r#"
            INSERT INTO products (category, id, name, price, display_order, stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(category.as_str())
        .bind(id)
        .bind(name)
        .bind(Decimal::new(price, 2))
        .bind(*slot)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
