//! `PostgreSQL` persistence for the Rolling economy core.
//!
//! The economy itself runs against an in-memory store. This crate is the
//! cold side: committed ledger entries are appended in batches, and the
//! holdings (resource rows and stuffs) can be saved and reloaded as
//! snapshots.
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`ledger_store`] -- Batch ledger entry insertion and querying
//! - [`holdings_store`] -- Holdings snapshot save and load
//! - [`error`] -- Shared error types

pub mod error;
pub mod holdings_store;
pub mod ledger_store;
pub mod postgres;

// Re-export primary types for convenience.
pub use error::DbError;
pub use holdings_store::{HoldingsSnapshot, HoldingsStore};
pub use ledger_store::{LedgerRow, LedgerStore};
pub use postgres::{PostgresConfig, PostgresPool};
