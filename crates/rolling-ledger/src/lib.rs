//! Audit ledger of items changing hands between characters.
//!
//! Every time a resource or a stuff leaves one character and reaches
//! another (a gift, a take, a business deal), one [`LedgerEntry`] is
//! recorded. Moves that keep an item with the same character, such as
//! dropping on the ground or picking up, are not recorded.
//!
//! # Architecture
//!
//! - [`ledger`] -- The [`Ledger`] struct: append-only log with recording methods.
//! - [`transaction`] -- The [`TransactionBuilder`] for validated entry construction.
//!
//! The ledger is owned by the store so that entries appended inside a
//! savepoint disappear with it when the savepoint is rolled back
//! ([`Ledger::truncate`]).
//!
//! # Usage
//!
//! ```
//! use rolling_ledger::{Ledger, TransferParams};
//! use rolling_types::{CharacterId, LedgerEntryType, ResourceId, TradeItem};
//! use rust_decimal::Decimal;
//!
//! let mut ledger = Ledger::new();
//! let giver = CharacterId::new();
//! let receiver = CharacterId::new();
//!
//! let recorded = ledger.record_transfer(TransferParams {
//!     entry_type: LedgerEntryType::Give,
//!     item: TradeItem::Resource(ResourceId::from("WOOD")),
//!     quantity: Decimal::new(5, 1),
//!     from_character: giver,
//!     to_character: receiver,
//!     reason: "GIVE".to_owned(),
//!     reference_id: None,
//! });
//! assert!(recorded.is_ok());
//! assert_eq!(ledger.len(), 1);
//! ```
//!
//! [`LedgerEntry`]: rolling_types::LedgerEntry

pub mod ledger;
pub mod transaction;

// Re-export primary types at crate root.
pub use ledger::{Ledger, TransferParams};
pub use transaction::TransactionBuilder;

use rolling_types::CharacterId;
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when recording ledger entries.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Quantity must be strictly positive.
    #[error("ledger entry quantity must be non-zero")]
    ZeroQuantity,

    /// Quantity must not be negative.
    #[error("ledger entry quantity must be positive, got {quantity}")]
    NegativeQuantity {
        /// The invalid quantity.
        quantity: Decimal,
    },

    /// A required field was not set on the builder.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Giver and receiver are the same character.
    #[error("ledger entry cannot move an item from {0} to itself")]
    SameCharacter(CharacterId),

    /// An internal error that should not occur in normal operation.
    #[error("internal ledger error: {0}")]
    InternalError(&'static str),
}
