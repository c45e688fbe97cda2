//! # skillswap-engine
//!
//! The exchange lifecycle engine: creation, acceptance, decline/revoke,
//! status progression with completion payout and cancellation refund, chat
//! messages, and ratings with average aggregation.
//!
//! The engine owns the single [`skillswap_store::Database`] handle behind a
//! `tokio::sync::Mutex`, so each operation's read-check-write sequence runs
//! serialized. Realtime delivery goes through an injected
//! [`skillswap_shared::events::EventSink`] and is fire-and-forget: once the
//! status transition and its ledger entries have committed, a failed publish
//! is logged and forgotten.

pub mod error;
pub mod exchange;
pub mod notify;
pub mod rating;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::EngineError;
pub use exchange::{ExchangeEngine, ExchangeTerms};
pub use notify::Notifier;
