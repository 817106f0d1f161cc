//! Player actions.
//!
//! Each action goes through the same lifecycle, driven by the
//! [`Dispatcher`](crate::dispatch::Dispatcher):
//!
//! 1. [`Action::get_cost`] -- cost for the given input, or `None` while the
//!    input is incomplete. Checked against the actor's action points
//!    before anything else.
//! 2. [`Action::check_request_is_possible`] -- game rules plus input checks.
//! 3. [`Action::perform`] -- either a sizing description asking for more
//!    input, or the transfer plus the action point debit in one savepoint.
//!
//! # Modules
//!
//! - [`move_items`] -- Give, take, deposit, drop and pick up
//! - [`fill`] -- Fill a container stuff
//! - [`bring`] -- Bring resources to a build under construction
//! - [`deal`] -- Accept a business offer

pub mod bring;
pub mod deal;
pub mod fill;
pub mod move_items;

pub use bring::{BringInput, BringResourceOnBuild};
pub use deal::MakeDeal;
pub use fill::{FillInput, FillStuff};
pub use move_items::{Direction, MoveInput, MoveItems};

use rolling_store::{Store, atomically};
use rolling_types::{
    ActionType, Character, CharacterId, Description, ResourceReduction, Stuff,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::business::DealSummary;
use crate::context::EconomyContext;
use crate::error::ActionError;

/// One kind of player action.
pub trait Action {
    /// Parameters submitted with the request.
    type Input: DeserializeOwned;

    /// The action type, used to look up the base cost.
    fn action_type(&self) -> ActionType;

    /// Whether the action may be offered to the actor at all.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Impossible`] when a game rule forbids it.
    fn check_is_possible(
        &self,
        context: &EconomyContext,
        store: &dyn Store,
        actor: &Character,
    ) -> Result<(), ActionError>;

    /// Action point cost of the request, `None` while it cannot be known.
    ///
    /// Reads but never mutates.
    fn get_cost(
        &self,
        context: &EconomyContext,
        store: &dyn Store,
        actor: &Character,
        input: &Self::Input,
    ) -> Option<Decimal>;

    /// Re-check the game rules and validate the input.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Impossible`] or a wrong input error.
    fn check_request_is_possible(
        &self,
        context: &EconomyContext,
        store: &dyn Store,
        actor: &Character,
        input: &Self::Input,
    ) -> Result<(), ActionError>;

    /// Ask for more input, or execute and debit action points.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step; nothing is mutated.
    fn perform(
        &self,
        context: &EconomyContext,
        store: &mut dyn Store,
        actor: &Character,
        input: &Self::Input,
    ) -> Result<Outcome, ActionError>;
}

/// Result of [`Action::perform`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The action was executed.
    Completed(Box<Completion>),
    /// More input is needed; nothing was mutated.
    NeedsMoreInput(Description),
}

impl Outcome {
    /// The completion, if the action was executed.
    pub fn completion(&self) -> Option<&Completion> {
        match self {
            Self::Completed(completion) => Some(completion),
            Self::NeedsMoreInput(_) => None,
        }
    }
}

/// What an executed action did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    /// The action executed.
    pub action_type: ActionType,
    /// Action points debited.
    pub cost: Decimal,
    /// Resource reductions, in source order.
    pub reductions: Vec<ResourceReduction>,
    /// Stuffs moved, as they are now.
    pub moved_stuffs: Vec<Stuff>,
    /// Deal exchanged, for [`ActionType::MakeDeal`].
    pub deal: Option<DealSummary>,
    /// Confirmation shown to the player.
    pub description: Description,
}

impl Completion {
    /// A completion with nothing moved yet.
    pub fn new(action_type: ActionType, cost: Decimal, description: Description) -> Self {
        Self {
            action_type,
            cost,
            reductions: Vec::new(),
            moved_stuffs: Vec::new(),
            deal: None,
            description,
        }
    }
}

/// Player-facing name of an action type.
pub const fn action_label(action_type: ActionType) -> &'static str {
    match action_type {
        ActionType::GiveToCharacter => "Give",
        ActionType::TakeFromCharacter => "Take",
        ActionType::DepositOnBuild => "Deposit",
        ActionType::TakeFromBuild => "Take from build",
        ActionType::DropOnGround => "Drop",
        ActionType::PickUpFromGround => "Pick up",
        ActionType::FillStuff => "Fill",
        ActionType::BringResourceOnBuild => "Bring",
        ActionType::MakeDeal => "Make a deal",
    }
}

/// Refuse anything from a dead actor.
///
/// # Errors
///
/// Returns [`ActionError::Impossible`] if the actor is dead.
pub fn check_actor_alive(actor: &Character) -> Result<(), ActionError> {
    if actor.alive {
        Ok(())
    } else {
        Err(ActionError::impossible("You are dead"))
    }
}

/// Run `op` and debit `cost` action points from `actor` in one savepoint.
///
/// The balance is re-read inside the savepoint, so a concurrent spend
/// between validation and execution is caught here.
///
/// # Errors
///
/// Returns [`ActionError::NotEnoughActionPoints`], or the error of `op`.
pub fn commit_with_cost<T>(
    store: &mut dyn Store,
    actor: CharacterId,
    cost: Decimal,
    op: impl FnOnce(&mut dyn Store) -> Result<T, ActionError>,
) -> Result<T, ActionError> {
    atomically(store, |store| {
        debit_action_points(store, actor, cost)?;
        op(store)
    })
}

fn debit_action_points(
    store: &mut dyn Store,
    actor: CharacterId,
    cost: Decimal,
) -> Result<(), ActionError> {
    if cost.is_zero() {
        return Ok(());
    }
    let character = store.character(actor)?;
    if character.action_points < cost {
        return Err(ActionError::NotEnoughActionPoints {
            required: cost,
            available: character.action_points,
        });
    }
    let remaining = character
        .action_points
        .checked_sub(cost)
        .ok_or_else(|| ActionError::ArithmeticOverflow {
            context: format!("debiting {cost} action points"),
        })?;
    store.set_action_points(actor, remaining)?;
    tracing::debug!(%actor, %cost, %remaining, "Action points debited");
    Ok(())
}
