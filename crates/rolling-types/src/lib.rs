//! Shared type definitions for the Rolling economy core.
//!
//! Every crate of the workspace speaks in these types. Types flow to
//! `TypeScript` via `ts-rs` so the game client renders the same shapes.
//!
//! # Modules
//!
//! - [`ids`] -- UUID wrappers for rows, string keys for configured kinds
//! - [`enums`] -- Units, equip slots, offer and action enumerations
//! - [`structs`] -- Characters, builds, holdings, offers, ledger entries
//! - [`description`] -- Declarative screens returned instead of errors

pub mod description;
pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use description::{Description, ErrorDescription, FormField, Part};
pub use enums::{
    ActionType, EquipSlot, LedgerEntryType, OfferItemPosition, OfferOperand, OfferStatus, Unit,
};
pub use ids::{
    AffinityId, BuildId, CharacterId, LedgerEntryId, OfferId, OfferItemId, ResourceId, StuffId,
    StuffType,
};
pub use structs::{
    Build, Character, GroundPoint, LedgerEntry, Offer, OfferItem, ResourceHolding,
    ResourceReduction, StorageLocation, Stuff, TradeItem,
};
