//! Error types for the economy core.
//!
//! Player-facing refusals ([`ActionError::Impossible`],
//! [`ActionError::WrongInput`], the `NotEnough*` variants) are turned into
//! structured descriptions at the dispatch boundary. Everything else
//! signals a deployment or programming bug and is propagated unchanged.

use rolling_ledger::LedgerError;
use rolling_store::StoreError;
use rolling_types::{ResourceId, StuffType, Unit};
use rust_decimal::Decimal;

/// Errors that can occur while validating or performing an action.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// A game rule forbids the action whatever the input.
    #[error("impossible action: {reason}")]
    Impossible {
        /// Explanation shown to the player.
        reason: String,
    },

    /// The input is invalid given the current state; a corrected input may succeed.
    #[error("wrong input: {reason}")]
    WrongInput {
        /// Explanation shown to the player.
        reason: String,
    },

    /// The accessible locations hold less of a resource than requested.
    #[error("not enough {name}: {required} required, {available} available")]
    NotEnoughResource {
        /// The resource requested.
        resource_id: ResourceId,
        /// Its display name.
        name: String,
        /// Its storage unit, for formatting quantities.
        unit: Unit,
        /// Quantity requested, in base unit.
        required: Decimal,
        /// Quantity actually found, in base unit.
        available: Decimal,
    },

    /// The accessible locations hold fewer stuffs of a kind than requested.
    #[error("not enough {name}: {required} required, {available} available")]
    NotEnoughStuff {
        /// The stuff kind requested.
        stuff_type: StuffType,
        /// Its display name.
        name: String,
        /// Count requested.
        required: u32,
        /// Count actually found.
        available: u32,
    },

    /// The actor cannot pay the action point cost.
    #[error("not enough action points: {required} required, {available} available")]
    NotEnoughActionPoints {
        /// Cost of the action.
        required: Decimal,
        /// Points the actor has left.
        available: Decimal,
    },

    /// A quantity computation overflowed.
    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: String,
    },

    /// Stored data references a resource missing from configuration.
    #[error("resource {0} is not configured")]
    UnknownResource(ResourceId),

    /// Stored data references a stuff kind missing from configuration.
    #[error("stuff type {0} is not configured")]
    UnknownStuffType(StuffType),

    /// Stored data references a build kind missing from configuration.
    #[error("build type {0} is not configured")]
    UnknownBuildType(String),

    /// The store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A ledger entry failed validation.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl ActionError {
    /// Shorthand for [`ActionError::Impossible`].
    pub fn impossible(reason: impl Into<String>) -> Self {
        Self::Impossible {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ActionError::WrongInput`].
    pub fn wrong_input(reason: impl Into<String>) -> Self {
        Self::WrongInput {
            reason: reason.into(),
        }
    }

    /// Map a lookup of an id named by the player's request.
    ///
    /// A missing character, build, stuff or offer is bad input; any other
    /// store failure stays fatal.
    pub fn from_requested(err: StoreError) -> Self {
        match err {
            StoreError::CharacterNotFound(_) => Self::wrong_input("There is no such character"),
            StoreError::BuildNotFound(_) => Self::wrong_input("There is no such build"),
            StoreError::StuffNotFound(_) => Self::wrong_input("There is no such object"),
            StoreError::OfferNotFound(_) => Self::wrong_input("There is no such offer"),
            other => Self::Store(other),
        }
    }

    /// Whether the error is a refusal to show to the player rather than a bug.
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Impossible { .. }
                | Self::WrongInput { .. }
                | Self::NotEnoughResource { .. }
                | Self::NotEnoughStuff { .. }
                | Self::NotEnoughActionPoints { .. }
        )
    }

    /// Whether retrying with a different input may succeed.
    pub const fn is_wrong_input(&self) -> bool {
        matches!(
            self,
            Self::WrongInput { .. } | Self::NotEnoughResource { .. } | Self::NotEnoughStuff { .. }
        )
    }
}
