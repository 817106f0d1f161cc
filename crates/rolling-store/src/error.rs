//! Error types for the location store.

use rolling_ledger::LedgerError;
use rolling_types::{BuildId, CharacterId, OfferId, StuffId};
use rust_decimal::Decimal;

/// Errors that can occur while reading or mutating the store.
///
/// The not-found variants may come from an id a player typed; callers
/// looking up such ids turn them into refusals. The others signal a caller
/// bug or a corrupted world and are not meant to be shown to players.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No character with this ID exists.
    #[error("character not found: {0}")]
    CharacterNotFound(CharacterId),

    /// No build with this ID exists.
    #[error("build not found: {0}")]
    BuildNotFound(BuildId),

    /// No stuff with this ID exists.
    #[error("stuff not found: {0}")]
    StuffNotFound(StuffId),

    /// No offer with this ID exists.
    #[error("offer not found: {0}")]
    OfferNotFound(OfferId),

    /// Quantities added or reduced must not be negative.
    #[error("negative quantity {quantity} passed to the store")]
    NegativeQuantity {
        /// The invalid quantity.
        quantity: Decimal,
    },

    /// A quantity computation overflowed.
    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: String,
    },

    /// Commit or rollback was called with no open savepoint.
    #[error("no savepoint is open")]
    NoOpenSavepoint,

    /// Savepoints must be closed innermost first.
    #[error("savepoint at depth {actual} closed while depth {expected} is innermost")]
    SavepointOutOfOrder {
        /// Depth of the innermost open savepoint.
        expected: usize,
        /// Depth of the savepoint being closed.
        actual: usize,
    },

    /// The operation needs every savepoint to be closed first.
    #[error("operation not allowed while a savepoint is open")]
    SavepointOpen,

    /// A ledger entry failed validation.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
