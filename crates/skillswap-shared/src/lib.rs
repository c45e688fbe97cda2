//! # skillswap-shared
//!
//! Vocabulary shared by the SkillSwap store, engine, and server crates:
//! the exchange status state machine, transaction kinds, points arithmetic,
//! realtime event payloads, and the signed bearer-token / password-hashing
//! primitives.

pub mod auth;
pub mod events;
pub mod ids;
pub mod points;
pub mod status;

pub use status::{ExchangeStatus, TransactionKind};
