//! Core business logic - framework-agnostic storefront operations.
//!
//! Everything in here works against the db layer and plain value objects;
//! no HTTP, templating, or session-cookie machinery. The basket, checkout,
//! and auth flows defined here are what a web frontend would call from its
//! handlers.

/// Registration and login against stored password hashes
pub mod auth;
/// Basket Ledger - session-scoped quantities reconciled against live stock
pub mod basket;
/// Catalogue reads, price formatting, and config-driven seeding
pub mod catalogue;
/// Order Committer - converts a reconciled basket into a persisted order
pub mod checkout;
/// Session value object - identity + basket + idle expiry
pub mod session;
