//! # skillswap-store
//!
//! SQLite persistence for SkillSwap, backed by rusqlite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed helpers for every domain model.
//! The ledger helpers in [`ledger`] are the only code allowed to touch
//! `users.points_balance`; each debit/credit pairs the balance mutation with
//! an append-only `transactions` row inside a single SQLite transaction.

pub mod database;
pub mod exchanges;
pub mod ledger;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod notifications;
pub mod offerings;
pub mod ratings;
pub mod skills;
pub mod users;

mod error;
mod row;

#[cfg(test)]
pub(crate) mod test_support;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
