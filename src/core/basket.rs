//! Basket Ledger - the session-scoped desired-quantity map.
//!
//! A [`Basket`] maps product ids to desired quantities. It lives inside
//! the caller's session state and is an explicit value object: handlers
//! receive it, mutate it, and hand it back, rather than reaching into an
//! ambient global. Quantities are only promises; [`Basket::reconcile`]
//! clamps them against live catalogue stock and is the single place where
//! clamping happens. Checkout must reconcile before computing an order
//! cost, otherwise an over-stock order could be placed.

use crate::db::{self, DbPool};
use crate::errors::Result;
use crate::models::BasketLine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

/// A single basket mutation, mirroring the two mutually exclusive form
/// fields: a relative increment (`quantity`) or an absolute replacement
/// (`new_quantity`). Exactly one applies per submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasketUpdate {
    /// Add a (possibly negative) delta to the current quantity.
    Add(i64),
    /// Replace the quantity outright.
    Set(i64),
}

/// The outcome of reconciling a basket against the live catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// One line per surviving basket entry, quantities clamped to stock.
    pub lines: Vec<BasketLine>,
    /// Sum of line costs, in minor currency units.
    pub total_cost: i64,
    /// Product ids that were in the basket but no longer exist in the
    /// catalogue. Their entries have been removed; callers should surface
    /// these as a warning rather than ignore them.
    pub missing_products: Vec<i64>,
}

/// Session-scoped mapping from product id to desired quantity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Basket {
    entries: BTreeMap<i64, i64>,
}

impl Basket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a single update to the entry for `product_id`. A resulting
    /// quantity below 1 removes the entry entirely.
    pub fn apply(&mut self, product_id: i64, update: BasketUpdate) {
        let new_quantity = match update {
            BasketUpdate::Add(delta) => self.quantity(product_id) + delta,
            BasketUpdate::Set(quantity) => quantity,
        };
        if new_quantity < 1 {
            self.entries.remove(&product_id);
        } else {
            self.entries.insert(product_id, new_quantity);
        }
        debug!(
            "Basket update for product {}: {:?} -> quantity {}",
            product_id, update, new_quantity
        );
    }

    /// Current desired quantity for a product (0 if absent).
    pub fn quantity(&self, product_id: i64) -> i64 {
        self.entries.get(&product_id).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Empties the basket. Called by checkout only after its transaction
    /// has committed.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates over (product id, desired quantity) pairs.
    pub fn entries(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.entries.iter().map(|(&id, &quantity)| (id, quantity))
    }

    /// Reconciles the basket against live catalogue stock.
    ///
    /// For every entry, the effective quantity is
    /// `min(max(desired, 0), stock)`:
    /// - entries whose effective quantity is below 1 are removed;
    /// - entries exceeding stock are clamped, and the clamp is written
    ///   back into the basket (this method takes `&mut self` precisely
    ///   because reconciliation mutates the ledger);
    /// - entries whose product no longer exists are removed and reported
    ///   in [`Reconciliation::missing_products`].
    ///
    /// Reconciling an already-reconciled basket is a no-op: the same
    /// lines and total come back and the ledger is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if a product lookup fails; the basket is
    /// left as it was at the point of failure.
    #[instrument(skip(self, pool))]
    pub async fn reconcile(&mut self, pool: &DbPool) -> Result<Reconciliation> {
        let mut lines = Vec::new();
        let mut missing_products = Vec::new();
        let mut total_cost = 0;

        // Snapshot the entries so removals below don't upset iteration.
        let snapshot: Vec<(i64, i64)> = self.entries().collect();
        for (product_id, desired) in snapshot {
            if desired < 1 {
                self.entries.remove(&product_id);
                continue;
            }
            let Some(product) = db::get_product(pool, product_id).await? else {
                warn!(
                    "Basket references product {} which no longer exists; dropping entry",
                    product_id
                );
                self.entries.remove(&product_id);
                missing_products.push(product_id);
                continue;
            };

            let effective = desired.min(product.stock);
            if effective < 1 {
                self.entries.remove(&product_id);
                continue;
            }
            if effective != desired {
                debug!(
                    "Clamping basket quantity for product {} from {} to stock {}",
                    product_id, desired, effective
                );
                self.entries.insert(product_id, effective);
            }

            let line_cost = product.price * effective;
            total_cost += line_cost;
            lines.push(BasketLine {
                product,
                quantity: effective,
                line_cost,
            });
        }

        Ok(Reconciliation {
            lines,
            total_cost,
            missing_products,
        })
    }
}
