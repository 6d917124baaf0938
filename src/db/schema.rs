use crate::errors::{Error, Result};
use rusqlite::Connection;
use tracing::{debug, info, instrument};

#[instrument(skip(conn))]
pub(crate) fn create_tables(conn: &Connection) -> Result<()> {
    debug!("Executing CREATE TABLE statements if tables do not exist.");
    conn.execute_batch(
        "BEGIN;

        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            price INTEGER NOT NULL CHECK (price >= 0), -- minor currency units
            stock INTEGER NOT NULL CHECK (stock >= 0),
            image TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            privilege TEXT NOT NULL DEFAULT 'user',
            addr_line1 TEXT,
            addr_line2 TEXT,
            addr_line3 TEXT,
            addr_city TEXT,
            addr_county TEXT,
            addr_postcode TEXT,
            addr_saved BOOLEAN NOT NULL DEFAULT FALSE,
            payment_number TEXT,
            payment_expiry TEXT,
            payment_saved BOOLEAN NOT NULL DEFAULT FALSE
            -- No CVV column: card verification values are never persisted.
        );

        CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            placed_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            address TEXT NOT NULL,
            cost INTEGER NOT NULL, -- minor currency units
            status TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users (id)
        );

        CREATE TABLE IF NOT EXISTS order_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id INTEGER NOT NULL,
            product_id INTEGER NOT NULL,
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            FOREIGN KEY (order_id) REFERENCES orders (id) ON DELETE CASCADE,
            FOREIGN KEY (product_id) REFERENCES products (id)
        );

        COMMIT;",
    )
    .map_err(|e| Error::Database(format!("Failed to create tables: {}", e)))?;
    info!("Database tables ensured (products, users, orders, order_items).");
    Ok(())
}
