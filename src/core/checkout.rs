//! Order Committer - turns a reconciled basket into a persisted order.
//!
//! The commit itself (order header + line items + stock decrements) runs
//! inside a single database transaction in `db::orders`; this module owns
//! the surrounding flow: authentication check, empty-basket refusal,
//! reconciliation, address flattening, optional profile saves, and
//! clearing the basket only after the transaction has committed.

use crate::core::basket::Reconciliation;
use crate::core::session::Session;
use crate::db::{self, DbPool};
use crate::errors::{Error, Result};
use crate::models::{Address, BasketLine, CheckoutProfile};
use tracing::{info, instrument, warn};

/// Everything submitted on the checkout form. The CVV is accepted so the
/// form shape matches what a payment processor would need, but it is
/// never persisted anywhere.
#[derive(Debug, Clone, Default)]
pub struct CheckoutForm {
    pub address: Address,
    pub payment_number: String,
    pub payment_expiry: String,
    pub payment_cvv: String,
    /// Persist the address onto the user profile for next time.
    pub save_address: bool,
    /// Persist number + expiry (never the CVV) onto the user profile.
    pub save_payment: bool,
}

/// What the confirmation page needs after a successful commit.
#[derive(Debug, Clone)]
pub struct OrderReceipt {
    pub order_id: i64,
    /// Total in minor currency units; equals the sum of line costs.
    pub cost: i64,
    pub lines: Vec<BasketLine>,
}

/// What the checkout page shows before submission: the reconciled basket
/// plus the saved prefill for the form.
#[derive(Debug, Clone)]
pub struct CheckoutPreview {
    pub reconciliation: Reconciliation,
    pub profile: CheckoutProfile,
}

/// Prepares the checkout page: reconciles the basket (clamps are written
/// back into the session) and loads the user's saved address/payment
/// prefill.
///
/// # Errors
///
/// Returns `Error::NotLoggedIn` if the session has no authenticated user.
/// Returns `Error::Database` on any storage failure.
#[instrument(skip(pool, session))]
pub async fn prepare_checkout(pool: &DbPool, session: &mut Session) -> Result<CheckoutPreview> {
    let user = session.user.clone().ok_or(Error::NotLoggedIn)?;
    let user_id = db::resolve_user_id(pool, &user.username)
        .await?
        .ok_or(Error::NotLoggedIn)?;

    let reconciliation = session.basket.reconcile(pool).await?;
    let profile = db::load_checkout_profile(pool, user_id).await?;

    Ok(CheckoutPreview {
        reconciliation,
        profile,
    })
}

/// Commits the session's basket as an order.
///
/// Steps, in order:
/// 1. resolve the numeric user id from the session's username;
/// 2. refuse an empty basket outright;
/// 3. reconcile the basket against live stock (clamps write back into the
///    session; missing products are dropped with a warning);
/// 4. persist the submitted address/payment details onto the profile when
///    the respective save flags are set (independent of the order itself);
/// 5. run the atomic commit (header, items, guarded stock decrements in
///    one transaction);
/// 6. clear the basket, only after the transaction committed.
///
/// On any storage failure the transaction is rolled back and the basket
/// is left untouched, so the checkout can simply be retried.
///
/// # Errors
///
/// Returns `Error::NotLoggedIn` if the session has no authenticated user.
/// Returns `Error::Validation` if the basket is empty, or becomes empty
/// after reconciliation.
/// Returns `Error::Database` if the commit transaction fails; no partial
/// order remains in that case.
#[instrument(skip(pool, session, form))]
pub async fn place_order(
    pool: &DbPool,
    session: &mut Session,
    form: &CheckoutForm,
) -> Result<OrderReceipt> {
    let user = session.user.clone().ok_or(Error::NotLoggedIn)?;
    let user_id = db::resolve_user_id(pool, &user.username)
        .await?
        .ok_or(Error::NotLoggedIn)?;

    if session.basket.is_empty() {
        return Err(Error::validation("Your basket is empty."));
    }

    let reconciliation = session.basket.reconcile(pool).await?;
    if !reconciliation.missing_products.is_empty() {
        warn!(
            "Checkout for user '{}' dropped {} unavailable product(s): {:?}",
            user.username,
            reconciliation.missing_products.len(),
            reconciliation.missing_products
        );
    }
    if reconciliation.lines.is_empty() {
        return Err(Error::validation(
            "Your basket is empty after removing unavailable items.",
        ));
    }

    // Profile saves are independent of the order commit and happen on the
    // submission path regardless of how the commit fares.
    if form.save_address {
        db::save_address(pool, user_id, &form.address).await?;
    }
    if form.save_payment {
        db::save_payment(pool, user_id, &form.payment_number, &form.payment_expiry).await?;
    }

    // This is where a real store would charge the payment processor.

    let address = flatten_address(&form.address);
    let order_id = db::execute_checkout(pool, user_id, &address, &reconciliation.lines).await?;

    session.basket.clear();
    info!(
        "Order {} placed by '{}' for {} minor units",
        order_id, user.username, reconciliation.total_cost
    );

    Ok(OrderReceipt {
        order_id,
        cost: reconciliation.total_cost,
        lines: reconciliation.lines,
    })
}

/// Joins the non-empty address fields with ", " in fixed field order:
/// line1, line2, line3, city, county, postcode.
fn flatten_address(address: &Address) -> String {
    [
        &address.line1,
        &address.line2,
        &address.line3,
        &address.city,
        &address.county,
        &address.postcode,
    ]
    .iter()
    .map(|field| field.trim())
    .filter(|field| !field.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}
