use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Product collections the storefront sells from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Smokes,
    SnackAttack,
    CandyBoom,
    SuperNuts,
    VibeSave,
    GameOn,
}

impl Category {
    /// Catalog order used wherever categories are listed together.
    pub const ALL: [Category; 6] = [
        Category::Smokes,
        Category::SnackAttack,
        Category::CandyBoom,
        Category::SuperNuts,
        Category::VibeSave,
        Category::GameOn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Smokes => "smokes",
            Category::SnackAttack => "snack-attack",
            Category::CandyBoom => "candy-boom",
            Category::SuperNuts => "super-nuts",
            Category::VibeSave => "vibe-save",
            Category::GameOn => "game-on",
        }
    }

    /// `snack-attack` -> `Snack Attack`.
    pub fn display_name(&self) -> String {
        self.as_str()
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown category `{0}`")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Locates a product's stock record. A product id alone is only unique
/// within its category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct ProductRef {
    pub category: Category,
    pub product_id: String,
}

impl ProductRef {
    pub fn new(category: Category, product_id: impl Into<String>) -> Self {
        Self {
            category,
            product_id: product_id.into(),
        }
    }
}

impl fmt::Display for ProductRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.product_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: String,
    pub category: Category,
    pub name: String,
    pub price: Decimal,
    pub image_url: String,
    pub is_available: bool,
    pub is_visible: bool,
    pub display_order: i32,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn reference(&self) -> ProductRef {
        ProductRef::new(self.category, self.id.clone())
    }
}

/// Current stock as seen inside a store transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRecord {
    pub reference: ProductRef,
    pub name: String,
    pub stock: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OrderType {
    #[serde(rename = "guest")]
    Guest,
    #[serde(rename = "point-of-sale")]
    PointOfSale,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Guest => "guest",
            OrderType::PointOfSale => "point-of-sale",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown order type `{0}`")]
pub struct UnknownOrderType(pub String);

impl FromStr for OrderType {
    type Err = UnknownOrderType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(OrderType::Guest),
            "point-of-sale" => Ok(OrderType::PointOfSale),
            other => Err(UnknownOrderType(other.to_string())),
        }
    }
}

/// Operator identity attached to point-of-sale orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Operator {
    pub id: String,
    pub display_name: String,
}

/// One order line, captured at placement time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub customer_name: String,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashier_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashier_name: Option<String>,
}

/// An order about to be persisted; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub customer_name: String,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub order_type: OrderType,
    pub operator: Option<Operator>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}
