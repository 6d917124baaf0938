use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::models::{Address, CheckoutProfile, User};
use rusqlite::{OptionalExtension, params};
use tracing::{debug, info, instrument};

/// Inserts a new user row.
///
/// The username is unique; a constraint violation is reported as
/// `Error::UsernameTaken` so registration can surface it directly. Relying
/// on the constraint (rather than a select-then-insert) means two
/// concurrent registrations of the same name race safely: exactly one
/// insert wins.
///
/// # Parameters
///
/// * `pool`: The database connection pool.
/// * `username`: The unique username.
/// * `password_hash`: The already-hashed password. Never a plaintext.
/// * `privilege`: The privilege level, e.g. "user".
///
/// # Returns
///
/// Returns `Ok(i64)` with the ID of the newly inserted user upon success.
///
/// # Errors
///
/// Returns `Error::UsernameTaken` if the username already exists.
/// Returns `Error::Database` if there's an issue acquiring the database lock
/// or executing the insert statement.
#[instrument(skip(pool, password_hash))]
pub async fn insert_user(
    pool: &DbPool,
    username: &str,
    password_hash: &str,
    privilege: &str,
) -> Result<i64> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock for adding user".to_string()))?;
    let mut stmt = conn.prepare_cached(
        "INSERT INTO users (username, password_hash, privilege) VALUES (?1, ?2, ?3)",
    )?;
    match stmt.insert(params![username, password_hash, privilege]) {
        Ok(user_id) => {
            info!("Registered user '{}' (ID: {})", username, user_id);
            Ok(user_id)
        }
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Err(Error::UsernameTaken {
                username: username.to_string(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Fetches a user row (including the password hash) by username.
///
/// # Returns
///
/// Returns `Ok(Some(User))` if a user with the given name is found,
/// `Ok(None)` otherwise.
///
/// # Errors
///
/// Returns `Error::Database` if there's an issue acquiring the database lock,
/// preparing the SQL statement, or mapping the query result.
#[instrument(skip(pool))]
pub async fn get_user_by_username(pool: &DbPool, username: &str) -> Result<Option<User>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(
        "SELECT id, username, password_hash, privilege FROM users WHERE username = ?1",
    )?;
    let user_result = stmt
        .query_row(params![username], |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
                privilege: row.get(3)?,
            })
        })
        .optional()?;

    debug!(
        "User lookup by name '{}': {}",
        username,
        if user_result.is_some() { "found" } else { "not found" }
    );
    Ok(user_result)
}

/// Resolves the numeric user id for a username.
///
/// # Returns
///
/// Returns `Ok(Some(i64))` if the user exists, `Ok(None)` otherwise.
///
/// # Errors
///
/// Returns `Error::Database` if there's an issue acquiring the database lock
/// or executing the query.
#[instrument(skip(pool))]
pub async fn resolve_user_id(pool: &DbPool, username: &str) -> Result<Option<i64>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached("SELECT id FROM users WHERE username = ?1 LIMIT 1")?;
    let user_id = stmt
        .query_row(params![username], |row| row.get(0))
        .optional()?;
    Ok(user_id)
}

/// Persists the submitted address fields onto the user profile and marks
/// the profile as having a saved address.
///
/// # Errors
///
/// Returns `Error::Database` if there's an issue acquiring the database lock,
/// executing the update, or if no row matched the user id.
#[instrument(skip(pool, address))]
pub async fn save_address(pool: &DbPool, user_id: i64, address: &Address) -> Result<()> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let rows_affected = conn.execute(
        "UPDATE users SET addr_line1 = ?1, addr_line2 = ?2, addr_line3 = ?3,
                          addr_city = ?4, addr_county = ?5, addr_postcode = ?6,
                          addr_saved = TRUE
         WHERE id = ?7",
        params![
            address.line1,
            address.line2,
            address.line3,
            address.city,
            address.county,
            address.postcode,
            user_id,
        ],
    )?;
    if rows_affected == 0 {
        return Err(Error::Database(format!(
            "Failed to save address: no user with id {}",
            user_id
        )));
    }
    info!("Saved address for user_id {}", user_id);
    Ok(())
}

/// Persists the payment number and expiry onto the user profile and marks
/// the profile as having saved payment details. The CVV is never accepted
/// here; there is no column for it.
///
/// # Errors
///
/// Returns `Error::Database` if there's an issue acquiring the database lock,
/// executing the update, or if no row matched the user id.
#[instrument(skip(pool, payment_number, payment_expiry))]
pub async fn save_payment(
    pool: &DbPool,
    user_id: i64,
    payment_number: &str,
    payment_expiry: &str,
) -> Result<()> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let rows_affected = conn.execute(
        "UPDATE users SET payment_number = ?1, payment_expiry = ?2, payment_saved = TRUE
         WHERE id = ?3",
        params![payment_number, payment_expiry, user_id],
    )?;
    if rows_affected == 0 {
        return Err(Error::Database(format!(
            "Failed to save payment details: no user with id {}",
            user_id
        )));
    }
    info!("Saved payment details for user_id {}", user_id);
    Ok(())
}

/// Loads the saved checkout prefill (address and payment number/expiry)
/// for a user. NULL columns come back as empty strings so the checkout
/// form can render them directly.
///
/// # Errors
///
/// Returns `Error::Database` if there's an issue acquiring the database lock
/// or executing the query, or if the user does not exist.
#[instrument(skip(pool))]
pub async fn load_checkout_profile(pool: &DbPool, user_id: i64) -> Result<CheckoutProfile> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(
        "SELECT COALESCE(addr_line1, ''), COALESCE(addr_line2, ''), COALESCE(addr_line3, ''),
                COALESCE(addr_city, ''), COALESCE(addr_county, ''), COALESCE(addr_postcode, ''),
                addr_saved,
                COALESCE(payment_number, ''), COALESCE(payment_expiry, ''),
                payment_saved
         FROM users WHERE id = ?1",
    )?;
    let profile = stmt
        .query_row(params![user_id], |row| {
            Ok(CheckoutProfile {
                addr_line1: row.get(0)?,
                addr_line2: row.get(1)?,
                addr_line3: row.get(2)?,
                addr_city: row.get(3)?,
                addr_county: row.get(4)?,
                addr_postcode: row.get(5)?,
                addr_saved: row.get(6)?,
                payment_number: row.get(7)?,
                payment_expiry: row.get(8)?,
                payment_saved: row.get(9)?,
            })
        })
        .optional()?;
    profile.ok_or(Error::Database(format!(
        "Failed to load checkout profile: no user with id {}",
        user_id
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{init_test_tracing, setup_test_db};
    use crate::errors::Result;

    #[tokio::test]
    async fn test_insert_and_get_user() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let user_id = insert_user(&pool, "alice", "$2b$12$fakehash", "user").await?;
        assert!(user_id > 0);

        let fetched = get_user_by_username(&pool, "alice").await?;
        assert!(fetched.is_some());
        let fetched = fetched.unwrap();
        assert_eq!(fetched.username, "alice");
        assert_eq!(fetched.password_hash, "$2b$12$fakehash");
        assert_eq!(fetched.privilege, "user");

        let resolved = resolve_user_id(&pool, "alice").await?;
        assert_eq!(resolved, Some(user_id));

        assert!(get_user_by_username(&pool, "bob").await?.is_none());
        assert!(resolve_user_id(&pool, "bob").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        insert_user(&pool, "alice", "hash1", "user").await?;
        let duplicate = insert_user(&pool, "alice", "hash2", "user").await;
        match duplicate {
            Err(Error::UsernameTaken { username }) => assert_eq!(username, "alice"),
            other => panic!("Expected UsernameTaken, got {:?}", other),
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_save_and_load_checkout_profile() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;
        let user_id = insert_user(&pool, "carol", "hash", "user").await?;

        // Fresh profile: everything empty, nothing saved.
        let fresh = load_checkout_profile(&pool, user_id).await?;
        assert_eq!(fresh, CheckoutProfile::default());

        let address = Address {
            line1: "1 High Street".to_string(),
            line2: String::new(),
            line3: String::new(),
            city: "Leeds".to_string(),
            county: "West Yorkshire".to_string(),
            postcode: "LS1 1AA".to_string(),
        };
        save_address(&pool, user_id, &address).await?;
        save_payment(&pool, user_id, "4111111111111111", "12/27").await?;

        let profile = load_checkout_profile(&pool, user_id).await?;
        assert_eq!(profile.addr_line1, "1 High Street");
        assert_eq!(profile.addr_line2, "");
        assert_eq!(profile.addr_city, "Leeds");
        assert_eq!(profile.addr_postcode, "LS1 1AA");
        assert!(profile.addr_saved);
        assert_eq!(profile.payment_number, "4111111111111111");
        assert_eq!(profile.payment_expiry, "12/27");
        assert!(profile.payment_saved);

        // Saving for a non-existent user fails rather than silently no-opping.
        assert!(save_address(&pool, user_id + 999, &address).await.is_err());
        assert!(save_payment(&pool, user_id + 999, "1", "2").await.is_err());

        Ok(())
    }
}
