//! Persistence errors.
//!
//! [`DbError`] wraps the [`sqlx`] and [`serde_json`] failures of this
//! crate and adds the cases where stored data does not decode.

/// Anything that can go wrong while talking to `PostgreSQL`.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A query or connection failed.
    #[error("postgres: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Applying the embedded migrations failed.
    #[error("migration: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored location could not be encoded or decoded.
    #[error("json column: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row does not describe a valid domain value.
    #[error("corrupt row in {table}: {reason}")]
    CorruptRow {
        /// Table the row was read from.
        table: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Bad connection settings.
    #[error("configuration: {0}")]
    Config(String),
}
