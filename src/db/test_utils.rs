#![allow(dead_code)]
use crate::db::{DbPool, schema};
use crate::errors::{Error, Result};
use rusqlite::Connection;
use rusqlite::params;
use std::sync::Arc;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")), // Default to TRACE for tests if RUST_LOG is not set
        )
        .with_test_writer() // Crucial for `cargo test` output
        .try_init(); // Use try_init to avoid panic if already initialized
}

// Helper to create an in-memory DbPool for testing.
// Each test gets a fresh, temporary database with the full schema applied.
pub(crate) async fn setup_test_db() -> Result<DbPool> {
    let conn = Connection::open_in_memory()
        .map_err(|e| Error::Database(format!("Test DB: Failed to open in-memory: {}", e)))?;
    conn.execute("PRAGMA foreign_keys = ON;", [])
        .map_err(|e| Error::Database(format!("Test DB: Failed to enable foreign keys: {}", e)))?;
    schema::create_tables(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

pub(crate) struct DirectProductArgs<'a> {
    pub(crate) conn: &'a Connection,
    pub(crate) name: &'a str,
    pub(crate) description: &'a str,
    pub(crate) price: i64,
    pub(crate) stock: i64,
    pub(crate) image: Option<&'a str>,
}

// Helper to quickly insert a test product for setup without going through
// the async catalogue functions.
pub(crate) fn direct_insert_product(args: &DirectProductArgs<'_>) -> Result<i64> {
    let mut stmt = args.conn.prepare_cached(
        "INSERT INTO products (name, description, price, stock, image)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let id = stmt.insert(params![
        args.name,
        args.description,
        args.price,
        args.stock,
        args.image
    ])?;
    Ok(id)
}

// Helper to read a product's live stock for test verification.
pub(crate) fn get_product_stock_for_test(conn: &Connection, product_id: i64) -> Result<i64> {
    let mut stmt = conn.prepare_cached("SELECT stock FROM products WHERE id = ?1")?;
    stmt.query_row(params![product_id], |row| row.get(0))
        .map_err(Error::from)
}

// Helper to count rows in a table for test verification. The table name is
// interpolated, so only call this with fixed identifiers from test code.
pub(crate) fn count_rows_for_test(conn: &Connection, table: &str) -> Result<i64> {
    let mut stmt = conn.prepare(&format!("SELECT COUNT(*) FROM {}", table))?;
    stmt.query_row([], |row| row.get(0)).map_err(Error::from)
}
