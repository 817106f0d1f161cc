//! Ownership and transfer rules of the Rolling economy.
//!
//! Everything here is synchronous and works against a [`Store`] handle
//! passed per request; the [`EconomyContext`] carries the configuration
//! and the affinity directory.
//!
//! # Modules
//!
//! - [`quantity`] -- Parsing and formatting of player-typed quantities.
//! - [`availability`] -- Which locations an actor may draw from, in order.
//! - [`transfer`] -- All-or-nothing moves of resources and stuffs.
//! - [`business`] -- Offer matching and deals.
//! - [`actions`] -- The player actions and their lifecycle.
//! - [`dispatch`] -- Request handling, cost gate first.
//! - [`context`] -- [`EconomyContext`].
//! - [`error`] -- [`ActionError`].
//!
//! [`Store`]: rolling_store::Store

pub mod actions;
pub mod availability;
pub mod business;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod quantity;
pub mod transfer;

pub use actions::{Action, Completion, Outcome};
pub use availability::{Listing, Resolver, TransferKind};
pub use business::{DealChoice, DealSummary, character_can_deal, make_deal, owner_can_deal};
pub use context::EconomyContext;
pub use dispatch::{ActionRequest, DispatchError, Dispatcher, GameAction, Response};
pub use error::ActionError;
pub use quantity::{ParsedQuantity, format_quantity, parse_user_quantity};
pub use transfer::{
    Audit, ResourceMove, StuffMove, reduce_across_locations, transfer_resource, transfer_stuffs,
};
