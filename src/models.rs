use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Based on the "products" table
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: i64, // Primary Key, INTEGER
    pub name: String,
    pub description: String,
    pub price: i64, // minor currency units (e.g. pence), never floats
    pub stock: i64, // non-negative; guarded at decrement time
    pub image: Option<String>, // reference into external upload storage
}

// Based on the "users" table. The password hash never leaves the db layer;
// this struct is the row shape used internally by authentication.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub privilege: String, // "user" or "admin"
}

/// A postal address as submitted on the checkout form. Fields may be
/// empty; flattening for the order record keeps only the non-empty ones.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub line1: String,
    pub line2: String,
    pub line3: String,
    pub city: String,
    pub county: String,
    pub postcode: String,
}

/// Saved checkout prefill for a user: address fields and payment
/// number/expiry. There is deliberately no CVV field anywhere.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct CheckoutProfile {
    pub addr_line1: String,
    pub addr_line2: String,
    pub addr_line3: String,
    pub addr_city: String,
    pub addr_county: String,
    pub addr_postcode: String,
    pub addr_saved: bool,
    pub payment_number: String,
    pub payment_expiry: String,
    pub payment_saved: bool,
}

// Based on the "orders" table
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub placed_at: DateTime<Utc>,
    pub address: String, // flattened, comma-separated non-empty fields
    pub cost: i64,       // minor currency units
    pub status: String,  // "ORDERED" on creation; immutable in this scope
}

// Based on the "order_items" table
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

/// One reconciled basket entry: the live product snapshot together with
/// the effective (clamped) quantity and the resulting line cost.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BasketLine {
    pub product: Product,
    pub quantity: i64,
    pub line_cost: i64, // product.price * quantity, minor units
}
