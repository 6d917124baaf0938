//! Session value object - identity, basket, and idle expiry.
//!
//! The session is explicit state passed into and returned from each
//! handler; nothing here is a global. A cookie/session-store collaborator
//! owns serialization and transport, which is why everything is serde-
//! round-trippable.

use crate::core::basket::Basket;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default idle timeout: sessions expire after 900 seconds of inactivity.
pub const DEFAULT_IDLE_TTL_SECS: i64 = 900;

/// The authenticated identity carried by a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionUser {
    pub username: String,
    pub privilege: String,
}

/// Per-visitor session state: optional identity plus the basket ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Set on login, cleared on logout.
    pub user: Option<SessionUser>,
    /// The visitor's basket; survives login and logout.
    pub basket: Basket,
    touched_at: DateTime<Utc>,
}

impl Session {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            user: None,
            basket: Basket::new(),
            touched_at: now,
        }
    }

    /// True once more than `ttl_secs` of inactivity have elapsed.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl_secs: i64) -> bool {
        now - self.touched_at > Duration::seconds(ttl_secs)
    }

    /// Refreshes the idle clock. Handlers call this on every request, so
    /// the expiry window slides with activity.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.touched_at = now;
    }

    /// Records a successful login.
    pub fn login(&mut self, user: SessionUser) {
        self.user = Some(user);
    }

    /// Clears the identity only; the basket is kept so a visitor can log
    /// back in and pick up where they left off.
    pub fn logout(&mut self) {
        self.user = None;
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::basket::BasketUpdate;

    #[test]
    fn test_expiry_window() {
        let start = Utc::now();
        let session = Session::new(start);

        assert!(!session.is_expired(start, DEFAULT_IDLE_TTL_SECS));
        assert!(
            !session.is_expired(
                start + Duration::seconds(DEFAULT_IDLE_TTL_SECS),
                DEFAULT_IDLE_TTL_SECS
            ),
            "Exactly at the TTL boundary the session is still live"
        );
        assert!(session.is_expired(
            start + Duration::seconds(DEFAULT_IDLE_TTL_SECS + 1),
            DEFAULT_IDLE_TTL_SECS
        ));
    }

    #[test]
    fn test_touch_slides_the_window() {
        let start = Utc::now();
        let mut session = Session::new(start);

        let later = start + Duration::seconds(800);
        session.touch(later);
        assert!(
            !session.is_expired(
                start + Duration::seconds(1600),
                DEFAULT_IDLE_TTL_SECS
            ),
            "Activity at t+800 keeps the session alive past t+900"
        );
    }

    #[test]
    fn test_logout_keeps_basket() {
        let mut session = Session::new(Utc::now());
        session.basket.apply(7, BasketUpdate::Set(2));
        session.login(SessionUser {
            username: "alice".to_string(),
            privilege: "user".to_string(),
        });
        assert!(session.is_logged_in());

        session.logout();
        assert!(!session.is_logged_in());
        assert_eq!(session.basket.quantity(7), 2, "Basket survives logout");
    }
}
