//! Moving resources and stuffs between characters, builds and the ground.
//!
//! All six directions share one [`Action`] implementation; they differ in
//! where items are drawn from (see [`TransferKind`]), where they land, and
//! whether the move is written to the ledger.

use rolling_store::Store;
use rolling_types::{
    ActionType, BuildId, Character, CharacterId, Description, FormField, LedgerEntryType, Part,
    ResourceId, StorageLocation, StuffId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use super::{Action, Completion, Outcome, action_label, check_actor_alive, commit_with_cost};
use crate::availability::{Resolver, TransferKind, co_located_character};
use crate::context::EconomyContext;
use crate::error::ActionError;
use crate::quantity::{
    default_quantity, default_stuff_count, format_quantity, parse_stuff_count,
    parse_user_quantity, unit_label,
};
use crate::transfer::{Audit, ResourceMove, StuffMove, transfer_resource, transfer_stuffs};

/// Ledger reason of gifts.
pub const GIVE_REASON: &str = "GIVE";
/// Ledger reason of takes from a vulnerable character.
pub const TAKE_BY_FORCE_REASON: &str = "TAKE_BY_FORCE";
/// Ledger reason of takes from a shared pool.
pub const TAKE_FROM_SHARED_REASON: &str = "TAKE_FROM_SHARED";

/// Where items go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From the actor to another character.
    GiveToCharacter(CharacterId),
    /// From another character to the actor.
    TakeFromCharacter(CharacterId),
    /// From the actor into a build.
    DepositOnBuild(BuildId),
    /// From a build to the actor.
    TakeFromBuild(BuildId),
    /// From the actor to the ground under them.
    DropOnGround,
    /// From the ground under the actor to the actor.
    PickUpFromGround,
}

impl Direction {
    /// The action type of this direction.
    pub const fn action_type(self) -> ActionType {
        match self {
            Self::GiveToCharacter(_) => ActionType::GiveToCharacter,
            Self::TakeFromCharacter(_) => ActionType::TakeFromCharacter,
            Self::DepositOnBuild(_) => ActionType::DepositOnBuild,
            Self::TakeFromBuild(_) => ActionType::TakeFromBuild,
            Self::DropOnGround => ActionType::DropOnGround,
            Self::PickUpFromGround => ActionType::PickUpFromGround,
        }
    }

    /// Where items are drawn from.
    pub const fn transfer_kind(self) -> TransferKind {
        match self {
            Self::GiveToCharacter(_) | Self::DropOnGround => TransferKind::OwnHoldings,
            Self::TakeFromCharacter(target) => TransferKind::TakeFromCharacter(target),
            Self::DepositOnBuild(build) => TransferKind::Deposit(build),
            Self::TakeFromBuild(build) => TransferKind::TakeFromBuild(build),
            Self::PickUpFromGround => TransferKind::PickUp,
        }
    }

    /// Where items land.
    pub const fn destination(self, actor: &Character) -> StorageLocation {
        match self {
            Self::GiveToCharacter(target) => StorageLocation::Inventory(target),
            Self::DepositOnBuild(build) => StorageLocation::Build(build),
            Self::DropOnGround => StorageLocation::Ground(actor.position),
            Self::TakeFromCharacter(_) | Self::TakeFromBuild(_) | Self::PickUpFromGround => {
                StorageLocation::Inventory(actor.id)
            }
        }
    }
}

/// Parameters of a move request. Each step of the dialog adds one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MoveInput {
    /// Stuff selected by the player.
    pub stuff_id: Option<StuffId>,
    /// Resource selected by the player.
    pub resource_id: Option<ResourceId>,
    /// Typed quantity, in the resource's unit or as a stuff count.
    pub quantity: Option<String>,
}

/// Move items in one [`Direction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveItems {
    /// Where items go.
    pub direction: Direction,
}

impl MoveItems {
    /// Create the action for a direction.
    pub const fn new(direction: Direction) -> Self {
        Self { direction }
    }

    fn resolver<'a>(&self, context: &'a EconomyContext, actor: &'a Character) -> Resolver<'a> {
        Resolver::new(context, actor, self.direction.transfer_kind())
    }

    fn audit(&self, store: &dyn Store) -> Result<Option<Audit>, ActionError> {
        Ok(match self.direction {
            Direction::GiveToCharacter(_) => {
                Some(Audit::new(LedgerEntryType::Give, GIVE_REASON))
            }
            Direction::TakeFromCharacter(target) => {
                let target = store
                    .character(target)
                    .map_err(ActionError::from_requested)?;
                let reason = if target.vulnerable {
                    TAKE_BY_FORCE_REASON
                } else {
                    TAKE_FROM_SHARED_REASON
                };
                Some(Audit::new(LedgerEntryType::Take, reason))
            }
            Direction::DepositOnBuild(_)
            | Direction::TakeFromBuild(_)
            | Direction::DropOnGround
            | Direction::PickUpFromGround => None,
        })
    }

    fn title(&self, store: &dyn Store) -> String {
        let label = action_label(self.direction.action_type());
        match self.direction {
            Direction::GiveToCharacter(id) | Direction::TakeFromCharacter(id) => store
                .character(id)
                .map_or_else(|_| label.to_owned(), |c| format!("{label}: {}", c.name)),
            _ => label.to_owned(),
        }
    }

    fn listing_description(
        &self,
        context: &EconomyContext,
        store: &dyn Store,
        resolver: &Resolver<'_>,
    ) -> Result<Description, ActionError> {
        let listing = resolver.listing(store)?;
        let mut description = Description::new(self.title(store));
        if listing.resources.is_empty() && listing.stuffs.is_empty() {
            return Ok(description.with_text("Nothing available"));
        }
        if let Some(label) = resolver.ground_label() {
            description = description.with_text(label);
        }
        for holding in &listing.resources {
            let resource = context.resource(&holding.resource_id)?;
            description = description.with_part(Part::Link {
                label: format!(
                    "{} ({})",
                    resource.name,
                    format_quantity(holding.quantity, resource.unit)
                ),
                params: json!({ "resource_id": holding.resource_id }),
            });
        }
        for stuff in &listing.stuffs {
            let config = context.stuff(&stuff.stuff_type)?;
            description = description.with_part(Part::Link {
                label: config.name.clone(),
                params: json!({ "stuff_id": stuff.id }),
            });
        }
        Ok(description)
    }

    fn perform_resource(
        &self,
        context: &EconomyContext,
        store: &mut dyn Store,
        actor: &Character,
        resource_id: &ResourceId,
        quantity: Option<&str>,
    ) -> Result<Outcome, ActionError> {
        let resolver = self.resolver(context, actor);
        let resource = context.requested_resource(resource_id)?;
        let available = resolver.available_quantity(&*store, resource_id)?;

        let Some(raw) = quantity else {
            let suggested = default_quantity(available, resource.unit);
            let description = Description::new(self.title(&*store)).with_part(Part::Form {
                params: json!({ "resource_id": resource_id }),
                fields: vec![FormField {
                    name: "quantity".to_owned(),
                    label: format!(
                        "Quantity of {} ({} available)",
                        resource.name,
                        format_quantity(available, resource.unit)
                    ),
                    default_value: Some(format_quantity(suggested, resource.unit)),
                    unit_label: unit_label(resource.unit).map(str::to_owned),
                }],
            });
            return Ok(Outcome::NeedsMoreInput(description));
        };

        let parsed = parse_user_quantity(raw, resource.unit)?;
        let params = ResourceMove {
            from: resolver.resource_sources(&*store)?,
            to: self.direction.destination(actor),
            resource_id: resource_id.clone(),
            quantity: parsed.quantity,
            audit: self.audit(&*store)?,
        };
        let action_type = self.direction.action_type();
        let cost = context.config().actions.cost_of(action_type);
        let reductions = commit_with_cost(store, actor.id, cost, |store| {
            transfer_resource(store, context, &params)
        })?;

        let description = Description::new(self.title(&*store))
            .with_text(format!("{}: {}", resource.name, parsed.display));
        let mut completion = Completion::new(action_type, cost, description);
        completion.reductions = reductions;
        Ok(Outcome::Completed(Box::new(completion)))
    }

    fn perform_stuff(
        &self,
        context: &EconomyContext,
        store: &mut dyn Store,
        actor: &Character,
        stuff_id: StuffId,
        quantity: Option<&str>,
    ) -> Result<Outcome, ActionError> {
        let resolver = self.resolver(context, actor);
        let stuff = store.stuff(stuff_id).map_err(ActionError::from_requested)?;
        let config = context.stuff(&stuff.stuff_type)?;
        let available = resolver.available_stuffs_like(&*store, &stuff)?.len();
        let available = u32::try_from(available).unwrap_or(u32::MAX);

        let count = match quantity {
            Some(raw) => parse_stuff_count(raw)?,
            None if available > 1 => {
                let description = Description::new(self.title(&*store)).with_part(Part::Form {
                    params: json!({ "stuff_id": stuff_id }),
                    fields: vec![FormField {
                        name: "quantity".to_owned(),
                        label: format!("Number of {} ({available} available)", config.name),
                        default_value: Some(default_stuff_count(available).to_string()),
                        unit_label: None,
                    }],
                });
                return Ok(Outcome::NeedsMoreInput(description));
            }
            None => 1,
        };

        let params = StuffMove {
            from: resolver.stuff_sources(&*store)?,
            to: self.direction.destination(actor),
            stuff_type: stuff.stuff_type.clone(),
            count,
            preferred: Some(stuff_id),
            audit: self.audit(&*store)?,
        };
        let action_type = self.direction.action_type();
        let cost = context.config().actions.cost_of(action_type);
        let moved = commit_with_cost(store, actor.id, cost, |store| {
            transfer_stuffs(store, context, &params)
        })?;

        let description = Description::new(self.title(&*store))
            .with_text(format!("{}: {count}", config.name));
        let mut completion = Completion::new(action_type, cost, description);
        completion.moved_stuffs = moved;
        Ok(Outcome::Completed(Box::new(completion)))
    }
}

fn check_resource_request(
    context: &EconomyContext,
    store: &dyn Store,
    resolver: &Resolver<'_>,
    resource_id: &ResourceId,
    quantity: Option<&str>,
) -> Result<(), ActionError> {
    let resource = context.requested_resource(resource_id)?;
    resolver.check_resource_allowed(store, resource_id)?;
    let Some(raw) = quantity else {
        return Ok(());
    };
    let requested = parse_user_quantity(raw, resource.unit)?.quantity;
    let available = resolver.available_quantity(store, resource_id)?;
    if requested > available {
        return Err(ActionError::NotEnoughResource {
            resource_id: resource_id.clone(),
            name: resource.name.clone(),
            unit: resource.unit,
            required: requested,
            available,
        });
    }
    Ok(())
}

fn check_stuff_request(
    context: &EconomyContext,
    store: &dyn Store,
    resolver: &Resolver<'_>,
    stuff_id: StuffId,
    quantity: Option<&str>,
) -> Result<(), ActionError> {
    resolver.check_stuffs_allowed(store)?;
    let stuff = store.stuff(stuff_id).map_err(ActionError::from_requested)?;
    if !resolver.stuff_sources(store)?.contains(&stuff.location) {
        return Err(ActionError::wrong_input("This object is not available"));
    }
    let Some(raw) = quantity else {
        return Ok(());
    };
    let requested = parse_stuff_count(raw)?;
    let available = resolver.available_stuffs_like(store, &stuff)?.len();
    if usize::try_from(requested).unwrap_or(usize::MAX) > available {
        return Err(ActionError::NotEnoughStuff {
            stuff_type: stuff.stuff_type.clone(),
            name: context.stuff(&stuff.stuff_type)?.name.clone(),
            required: requested,
            available: u32::try_from(available).unwrap_or(u32::MAX),
        });
    }
    Ok(())
}

impl Action for MoveItems {
    type Input = MoveInput;

    fn action_type(&self) -> ActionType {
        self.direction.action_type()
    }

    fn check_is_possible(
        &self,
        context: &EconomyContext,
        store: &dyn Store,
        actor: &Character,
    ) -> Result<(), ActionError> {
        check_actor_alive(actor)?;
        if let Direction::GiveToCharacter(target) = self.direction {
            co_located_character(store, actor, target)?;
        }
        self.resolver(context, actor).check_access(store)
    }

    fn get_cost(
        &self,
        context: &EconomyContext,
        store: &dyn Store,
        actor: &Character,
        input: &MoveInput,
    ) -> Option<Decimal> {
        let sized = match (&input.resource_id, input.stuff_id, &input.quantity) {
            (_, _, Some(_)) => input.resource_id.is_some() || input.stuff_id.is_some(),
            (None, Some(stuff_id), None) => store.stuff(stuff_id).is_ok_and(|stuff| {
                self.resolver(context, actor)
                    .available_stuffs_like(store, &stuff)
                    .is_ok_and(|others| others.len() <= 1)
            }),
            _ => false,
        };
        sized.then(|| context.config().actions.cost_of(self.action_type()))
    }

    fn check_request_is_possible(
        &self,
        context: &EconomyContext,
        store: &dyn Store,
        actor: &Character,
        input: &MoveInput,
    ) -> Result<(), ActionError> {
        self.check_is_possible(context, store, actor)?;
        let resolver = self.resolver(context, actor);
        match (&input.resource_id, input.stuff_id) {
            (Some(_), Some(_)) => Err(ActionError::wrong_input(
                "Choose either a resource or an object, not both",
            )),
            (Some(resource_id), None) => check_resource_request(
                context,
                store,
                &resolver,
                resource_id,
                input.quantity.as_deref(),
            ),
            (None, Some(stuff_id)) => check_stuff_request(
                context,
                store,
                &resolver,
                stuff_id,
                input.quantity.as_deref(),
            ),
            (None, None) => Ok(()),
        }
    }

    fn perform(
        &self,
        context: &EconomyContext,
        store: &mut dyn Store,
        actor: &Character,
        input: &MoveInput,
    ) -> Result<Outcome, ActionError> {
        match (&input.resource_id, input.stuff_id) {
            (Some(resource_id), None) => self.perform_resource(
                context,
                store,
                actor,
                resource_id,
                input.quantity.as_deref(),
            ),
            (None, Some(stuff_id)) => {
                self.perform_stuff(context, store, actor, stuff_id, input.quantity.as_deref())
            }
            (Some(_), Some(_)) => Err(ActionError::wrong_input(
                "Choose either a resource or an object, not both",
            )),
            (None, None) => {
                let resolver = self.resolver(context, actor);
                let description = self.listing_description(context, &*store, &resolver)?;
                Ok(Outcome::NeedsMoreInput(description))
            }
        }
    }
}
