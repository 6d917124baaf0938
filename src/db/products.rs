use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::models::Product;
use rusqlite::{OptionalExtension, params};
use tracing::{debug, info, instrument};

/// Adds a new product to the catalogue.
///
/// # Parameters
///
/// * `pool`: The database connection pool.
/// * `name`: The display name of the product.
/// * `description`: The longer description for the detail page.
/// * `price`: The unit price in minor currency units. Must be non-negative.
/// * `stock`: The initial stock level. Must be non-negative.
/// * `image`: An optional image reference (filename in the upload store).
///
/// # Returns
///
/// Returns `Ok(i64)` with the ID of the newly inserted product upon success.
///
/// # Errors
///
/// Returns `Error::Validation` if `price` or `stock` is negative.
/// Returns `Error::Database` if there's an issue acquiring the database lock
/// or executing the insert statement.
#[instrument(skip(pool, description))]
pub async fn insert_product(
    pool: &DbPool,
    name: &str,
    description: &str,
    price: i64,
    stock: i64,
    image: Option<&str>,
) -> Result<i64> {
    if price < 0 {
        return Err(Error::validation("Product price cannot be negative."));
    }
    if stock < 0 {
        return Err(Error::validation("Product stock cannot be negative."));
    }
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock for adding product".to_string()))?;
    let mut stmt = conn.prepare_cached(
        "INSERT INTO products (name, description, price, stock, image) VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let product_id = stmt.insert(params![name, description, price, stock, image])?;
    info!(
        "Added new product '{}' (ID: {}) with price {} and stock {}",
        name, product_id, price, stock
    );
    Ok(product_id)
}

/// Fetches a product by its id.
///
/// # Returns
///
/// Returns `Ok(Some(Product))` if a product with the given id is found.
/// Returns `Ok(None)` if no product with that id exists.
///
/// # Errors
///
/// Returns `Error::Database` if there's an issue acquiring the database lock,
/// preparing the SQL statement, or mapping the query result.
#[instrument(skip(pool))]
pub async fn get_product(pool: &DbPool, product_id: i64) -> Result<Option<Product>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(
        "SELECT id, name, description, price, stock, image FROM products WHERE id = ?1",
    )?;
    let product_result = stmt
        .query_row(params![product_id], |row| {
            Ok(Product {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                price: row.get(3)?,
                stock: row.get(4)?,
                image: row.get(5)?,
            })
        })
        .optional()?; // Handles case where no product is found

    debug!(
        "Product lookup by id {}: {}",
        product_id,
        if product_result.is_some() { "found" } else { "not found" }
    );
    Ok(product_result)
}

/// Lists all products in the catalogue, most recently added first.
///
/// # Errors
///
/// Returns `Error::Database` if there's an issue acquiring the database lock,
/// preparing the SQL statement, or mapping query results.
#[instrument(skip(pool))]
pub async fn list_products(pool: &DbPool) -> Result<Vec<Product>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(
        "SELECT id, name, description, price, stock, image FROM products ORDER BY id DESC",
    )?;
    let product_iter = stmt.query_map([], |row| {
        Ok(Product {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            price: row.get(3)?,
            stock: row.get(4)?,
            image: row.get(5)?,
        })
    })?;

    let mut products = Vec::new();
    for product_result in product_iter {
        products.push(
            product_result
                .map_err(|e| Error::Database(format!("Failed to map product row: {}", e)))?,
        );
    }
    debug!("Fetched {} products.", products.len());
    Ok(products)
}

/// Fetches a product by its exact name.
///
/// Used by catalogue seeding to keep startup idempotent.
///
/// # Errors
///
/// Returns `Error::Database` if there's an issue acquiring the database lock
/// or executing the query.
#[instrument(skip(pool))]
pub async fn get_product_by_name(pool: &DbPool, name: &str) -> Result<Option<Product>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(
        "SELECT id, name, description, price, stock, image FROM products WHERE name = ?1 LIMIT 1",
    )?;
    let product_result = stmt
        .query_row(params![name], |row| {
            Ok(Product {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                price: row.get(3)?,
                stock: row.get(4)?,
                image: row.get(5)?,
            })
        })
        .optional()?;
    Ok(product_result)
}

/// Decrements a product's stock by `amount`, guarded against going negative.
///
/// The UPDATE only matches when the remaining stock covers the decrement,
/// so stock can never drop below zero regardless of what the caller
/// believed the stock level to be.
///
/// # Errors
///
/// Returns `Error::Validation` if `amount` is not positive.
/// Returns `Error::Database` if the guard misses (insufficient stock or
/// unknown product) or if the statement fails.
#[instrument(skip(pool))]
pub async fn decrement_stock(pool: &DbPool, product_id: i64, amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(Error::validation("Stock decrement must be positive."));
    }
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    decrement_stock_guarded(&conn, product_id, amount)
}

/// Guarded stock decrement against any connection-like handle.
///
/// Shared between the pool-level [`decrement_stock`] and the checkout
/// transaction in `db::orders`, so both paths use the identical guard.
pub(crate) fn decrement_stock_guarded(
    conn: &rusqlite::Connection,
    product_id: i64,
    amount: i64,
) -> Result<()> {
    let rows_affected = conn.execute(
        "UPDATE products SET stock = stock - ?1 WHERE id = ?2 AND stock >= ?1",
        params![amount, product_id],
    )?;
    if rows_affected == 0 {
        return Err(Error::Database(format!(
            "Stock decrement of {} for product {} failed: insufficient stock or unknown product",
            amount, product_id
        )));
    }
    debug!("Decremented stock of product {} by {}", product_id, amount);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{
        DirectProductArgs, direct_insert_product, get_product_stock_for_test, init_test_tracing,
        setup_test_db,
    };
    use crate::errors::Result;

    #[tokio::test]
    async fn test_insert_and_get_product() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let product_id = insert_product(
            &pool,
            "Mug",
            "Stoneware mug",
            850,
            40,
            Some("mug.png"),
        )
        .await?;
        assert!(product_id > 0);

        let fetched = get_product(&pool, product_id).await?;
        assert!(fetched.is_some());
        let fetched = fetched.unwrap();
        assert_eq!(fetched.name, "Mug");
        assert_eq!(fetched.description, "Stoneware mug");
        assert_eq!(fetched.price, 850);
        assert_eq!(fetched.stock, 40);
        assert_eq!(fetched.image.as_deref(), Some("mug.png"));

        // Unknown id
        let missing = get_product(&pool, product_id + 999).await?;
        assert!(missing.is_none(), "Unknown product id should yield None");

        Ok(())
    }

    #[tokio::test]
    async fn test_insert_product_rejects_negative_values() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let negative_price = insert_product(&pool, "Bad", "desc", -1, 5, None).await;
        assert!(negative_price.is_err(), "Negative price should be rejected");

        let negative_stock = insert_product(&pool, "Bad", "desc", 100, -5, None).await;
        assert!(negative_stock.is_err(), "Negative stock should be rejected");

        Ok(())
    }

    #[tokio::test]
    async fn test_list_products_newest_first() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let empty = list_products(&pool).await?;
        assert!(empty.is_empty(), "Catalogue should be empty initially");

        insert_product(&pool, "First", "d", 100, 1, None).await?;
        insert_product(&pool, "Second", "d", 200, 2, None).await?;
        insert_product(&pool, "Third", "d", 300, 3, None).await?;

        let products = list_products(&pool).await?;
        assert_eq!(products.len(), 3);
        assert_eq!(products[0].name, "Third", "Most recent product first");
        assert_eq!(products[1].name, "Second");
        assert_eq!(products[2].name, "First");

        Ok(())
    }

    #[tokio::test]
    async fn test_decrement_stock_guard() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;
        let product_id;
        {
            let conn = pool.lock().unwrap();
            product_id = direct_insert_product(&DirectProductArgs {
                conn: &conn,
                name: "Poster",
                description: "A2 print",
                price: 1200,
                stock: 3,
                image: None,
            })?;
        }

        decrement_stock(&pool, product_id, 2).await?;
        {
            let conn = pool.lock().unwrap();
            assert_eq!(get_product_stock_for_test(&conn, product_id)?, 1);
        }

        // Over-decrement must miss the guard and leave stock untouched.
        let over = decrement_stock(&pool, product_id, 2).await;
        assert!(over.is_err(), "Decrement past zero should fail");
        {
            let conn = pool.lock().unwrap();
            assert_eq!(get_product_stock_for_test(&conn, product_id)?, 1);
        }

        // Zero and negative amounts are rejected before touching the db.
        assert!(decrement_stock(&pool, product_id, 0).await.is_err());
        assert!(decrement_stock(&pool, product_id, -1).await.is_err());

        // Unknown product also misses the guard.
        assert!(decrement_stock(&pool, product_id + 999, 1).await.is_err());

        Ok(())
    }
}
