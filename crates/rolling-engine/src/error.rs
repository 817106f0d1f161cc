//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure that stops the request loop.

use rolling_economy::DispatchError;

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Game configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: rolling_core::ConfigError,
    },

    /// World seed loading failed.
    #[error("seed error: {source}")]
    Seed {
        /// The underlying seed error.
        #[from]
        source: rolling_core::SeedError,
    },

    /// Persistence failed.
    #[error("database error: {source}")]
    Db {
        /// The underlying database error.
        #[from]
        source: rolling_db::DbError,
    },

    /// Draining the in-memory ledger failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: rolling_store::StoreError,
    },

    /// A request failed for a reason that is not a game refusal.
    #[error("dispatch error: {source}")]
    Dispatch {
        /// The underlying dispatch error.
        #[from]
        source: DispatchError,
    },

    /// A response could not be encoded.
    #[error("encoding error: {source}")]
    Encode {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// Reading requests or writing responses failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
