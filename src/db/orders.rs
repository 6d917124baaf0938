use crate::db::DbPool;
use crate::db::products::decrement_stock_guarded;
use crate::errors::{Error, Result};
use crate::models::{BasketLine, Order, OrderItem};
use rusqlite::{OptionalExtension, params};
use tracing::{debug, info, instrument};

/// Status given to every order at creation. Orders are immutable in this
/// scope, so no other status value is ever written.
pub const STATUS_ORDERED: &str = "ORDERED";

/// Atomically persists a checkout: the order header, one order item per
/// reconciled basket line, and the matching stock decrements.
///
/// All statements run inside a single database transaction. If any item
/// insert fails, or any stock decrement misses its guard (stock shrank
/// between reconciliation and commit), the whole transaction is rolled
/// back: no order row, no items, and no stock change remain.
///
/// # Parameters
///
/// * `pool`: The database connection pool.
/// * `user_id`: The id of the ordering user.
/// * `address`: The flattened delivery address.
/// * `lines`: The reconciled basket lines. Must be non-empty; quantities
///   must already be clamped to stock by reconciliation.
///
/// # Returns
///
/// Returns `Ok(i64)` with the id of the newly created order.
///
/// # Errors
///
/// Returns `Error::Validation` if `lines` is empty.
/// Returns `Error::Database` if the lock cannot be acquired, if starting
/// or committing the transaction fails, or if any insert or guarded
/// decrement inside the transaction fails.
#[instrument(skip(pool, address, lines))]
pub async fn execute_checkout(
    pool: &DbPool,
    user_id: i64,
    address: &str,
    lines: &[BasketLine],
) -> Result<i64> {
    if lines.is_empty() {
        return Err(Error::validation("Cannot commit an order with no items."));
    }

    let cost: i64 = lines.iter().map(|line| line.line_cost).sum();

    let mut conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock for checkout".to_string()))?;

    let tx = conn
        .transaction()
        .map_err(|e| Error::Database(format!("Failed to start checkout transaction: {}", e)))?;

    // 1. Order header
    let placed_at = chrono::Utc::now();
    tx.execute(
        "INSERT INTO orders (user_id, placed_at, address, cost, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, placed_at, address, cost, STATUS_ORDERED],
    )
    .map_err(|e| {
        Error::Database(format!(
            "Failed to insert order for user_id {} in transaction: {}",
            user_id, e
        ))
    })?;
    let order_id = tx.last_insert_rowid();

    // 2. One item per line, decrementing stock as we go. A guard miss or
    // insert failure here unwinds the whole transaction on drop.
    for line in lines {
        tx.execute(
            "INSERT INTO order_items (order_id, product_id, quantity) VALUES (?1, ?2, ?3)",
            params![order_id, line.product.id, line.quantity],
        )
        .map_err(|e| {
            Error::Database(format!(
                "Failed to insert order item (order {}, product {}) in transaction: {}",
                order_id, line.product.id, e
            ))
        })?;

        decrement_stock_guarded(&tx, line.product.id, line.quantity)?;
    }

    tx.commit().map_err(|e| {
        Error::Database(format!(
            "Failed to commit checkout transaction for order {}: {}",
            order_id, e
        ))
    })?;

    info!(
        "Committed order {} for user_id {}: {} line(s), cost {} minor units",
        order_id,
        user_id,
        lines.len(),
        cost
    );
    Ok(order_id)
}

/// Fetches an order header by id.
///
/// # Errors
///
/// Returns `Error::Database` if there's an issue acquiring the database lock
/// or executing the query.
#[instrument(skip(pool))]
pub async fn get_order(pool: &DbPool, order_id: i64) -> Result<Option<Order>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(
        "SELECT id, user_id, placed_at, address, cost, status FROM orders WHERE id = ?1",
    )?;
    let order = stmt
        .query_row(params![order_id], |row| {
            Ok(Order {
                id: row.get(0)?,
                user_id: row.get(1)?,
                placed_at: row.get(2)?,
                address: row.get(3)?,
                cost: row.get(4)?,
                status: row.get(5)?,
            })
        })
        .optional()?;
    Ok(order)
}

/// Lists a user's orders for the account page, most recent first.
///
/// # Errors
///
/// Returns `Error::Database` if there's an issue acquiring the database lock,
/// preparing the SQL statement, or mapping query results.
#[instrument(skip(pool))]
pub async fn list_orders_for_user(pool: &DbPool, user_id: i64) -> Result<Vec<Order>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(
        "SELECT id, user_id, placed_at, address, cost, status
         FROM orders WHERE user_id = ?1 ORDER BY id DESC",
    )?;
    let order_iter = stmt.query_map(params![user_id], |row| {
        Ok(Order {
            id: row.get(0)?,
            user_id: row.get(1)?,
            placed_at: row.get(2)?,
            address: row.get(3)?,
            cost: row.get(4)?,
            status: row.get(5)?,
        })
    })?;

    let mut orders = Vec::new();
    for order_result in order_iter {
        orders.push(
            order_result.map_err(|e| Error::Database(format!("Failed to map order row: {}", e)))?,
        );
    }
    debug!("Fetched {} orders for user_id {}", orders.len(), user_id);
    Ok(orders)
}

/// Lists the line items of an order.
///
/// # Errors
///
/// Returns `Error::Database` if there's an issue acquiring the database lock,
/// preparing the SQL statement, or mapping query results.
#[instrument(skip(pool))]
pub async fn list_items_for_order(pool: &DbPool, order_id: i64) -> Result<Vec<OrderItem>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(
        "SELECT order_id, product_id, quantity FROM order_items WHERE order_id = ?1",
    )?;
    let item_iter = stmt.query_map(params![order_id], |row| {
        Ok(OrderItem {
            order_id: row.get(0)?,
            product_id: row.get(1)?,
            quantity: row.get(2)?,
        })
    })?;

    let mut items = Vec::new();
    for item_result in item_iter {
        items.push(
            item_result
                .map_err(|e| Error::Database(format!("Failed to map order item row: {}", e)))?,
        );
    }
    Ok(items)
}
