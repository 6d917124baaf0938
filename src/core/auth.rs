//! Registration and login.
//!
//! Password hashing is delegated to bcrypt, which performs a salted,
//! constant-time verification; this module makes no further assumptions
//! about the primitive beyond "fails closed on mismatch". Login reports
//! one uniform error for an unknown username and a wrong password so the
//! response can never be used to enumerate accounts.

use crate::core::session::SessionUser;
use crate::db::{self, DbPool};
use crate::errors::{Error, Result};
use tracing::{info, instrument, warn};

/// Privilege assigned to every self-registered account.
pub const DEFAULT_PRIVILEGE: &str = "user";

/// Registers a new account.
///
/// The caller-facing validation (empty fields, password confirmation)
/// happens first; the duplicate-username check is left to the database's
/// UNIQUE constraint so that two concurrent registrations of the same
/// name cannot both succeed.
///
/// # Returns
///
/// Returns `Ok(i64)` with the new user's id.
///
/// # Errors
///
/// Returns `Error::Validation` if the username or password is empty, or
/// if the confirmation does not match.
/// Returns `Error::UsernameTaken` if the username already exists.
/// Returns `Error::Bcrypt` or `Error::Database` on hashing or storage
/// failures.
#[instrument(skip(pool, password, confirm))]
pub async fn register(
    pool: &DbPool,
    username: &str,
    password: &str,
    confirm: &str,
) -> Result<i64> {
    if username.trim().is_empty() {
        return Err(Error::validation("Username must not be empty."));
    }
    if password.is_empty() {
        return Err(Error::validation("Password must not be empty."));
    }
    if password != confirm {
        return Err(Error::validation("Passwords do not match."));
    }

    let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
    let user_id = db::insert_user(pool, username, &password_hash, DEFAULT_PRIVILEGE).await?;
    info!("Account created for '{}' (ID: {})", username, user_id);
    Ok(user_id)
}

/// Verifies a username/password pair and returns the session identity.
///
/// # Errors
///
/// Returns `Error::AuthFailed` for an unknown username AND for a wrong
/// password; the two cases are indistinguishable to the caller.
/// Returns `Error::Bcrypt` or `Error::Database` on hashing or storage
/// failures.
#[instrument(skip(pool, password))]
pub async fn login(pool: &DbPool, username: &str, password: &str) -> Result<SessionUser> {
    let Some(user) = db::get_user_by_username(pool, username).await? else {
        warn!("Login attempt for unknown username");
        return Err(Error::AuthFailed);
    };

    if !bcrypt::verify(password, &user.password_hash)? {
        warn!("Failed login attempt for '{}'", username);
        return Err(Error::AuthFailed);
    }

    info!("User '{}' logged in", username);
    Ok(SessionUser {
        username: user.username,
        privilege: user.privilege,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{init_test_tracing, setup_test_db};
    use crate::errors::Result;

    #[tokio::test]
    async fn test_register_and_login_round_trip() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let user_id = register(&pool, "alice", "correct horse", "correct horse").await?;
        assert!(user_id > 0);

        let session_user = login(&pool, "alice", "correct horse").await?;
        assert_eq!(session_user.username, "alice");
        assert_eq!(session_user.privilege, DEFAULT_PRIVILEGE);

        // The stored hash is a bcrypt hash, not the plaintext.
        let stored = db::get_user_by_username(&pool, "alice").await?.unwrap();
        assert_ne!(stored.password_hash, "correct horse");
        assert!(stored.password_hash.starts_with("$2"));

        Ok(())
    }

    #[tokio::test]
    async fn test_register_validation() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        assert!(matches!(
            register(&pool, "", "pw", "pw").await,
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            register(&pool, "bob", "", "").await,
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            register(&pool, "bob", "pw1", "pw2").await,
            Err(Error::Validation { .. })
        ));

        // Nothing was persisted by the rejected attempts.
        assert!(db::get_user_by_username(&pool, "bob").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        register(&pool, "alice", "pw", "pw").await?;
        let second = register(&pool, "alice", "other", "other").await;
        assert!(matches!(second, Err(Error::UsernameTaken { .. })));

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_registration_exactly_one_wins() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let pool1 = pool.clone();
        let pool2 = pool.clone();
        let (first, second) = tokio::join!(
            tokio::spawn(async move { register(&pool1, "alice", "pw", "pw").await }),
            tokio::spawn(async move { register(&pool2, "alice", "pw", "pw").await }),
        );
        let results = [first.unwrap(), second.unwrap()];

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "Exactly one concurrent registration wins");
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(Error::UsernameTaken { .. }))),
            "The loser sees a duplicate-username error"
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;
        register(&pool, "alice", "correct horse", "correct horse").await?;

        let wrong_password = login(&pool, "alice", "battery staple").await;
        let unknown_user = login(&pool, "mallory", "battery staple").await;

        let wrong_password = wrong_password.expect_err("wrong password must fail");
        let unknown_user = unknown_user.expect_err("unknown user must fail");
        assert!(matches!(wrong_password, Error::AuthFailed));
        assert!(matches!(unknown_user, Error::AuthFailed));
        assert_eq!(
            wrong_password.to_string(),
            unknown_user.to_string(),
            "Same user-visible message for both failure modes"
        );

        Ok(())
    }
}
