//! Filling a container stuff with a resource.
//!
//! The container must be carried by the actor. It is filled up to its
//! configured capacity from whatever the actor can use, ground first.

use rolling_core::StuffConfig;
use rolling_store::Store;
use rolling_types::{
    ActionType, Character, Description, Part, ResourceId, StorageLocation, Stuff, StuffId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use super::{Action, Completion, Outcome, action_label, check_actor_alive, commit_with_cost};
use crate::availability::{Resolver, TransferKind};
use crate::context::EconomyContext;
use crate::error::ActionError;
use crate::quantity::format_quantity;
use crate::transfer::reduce_across_locations;

/// Parameters of a fill request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FillInput {
    /// Resource to pour into the container.
    pub resource_id: Option<ResourceId>,
}

/// Fill one container stuff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillStuff {
    /// The container.
    pub stuff_id: StuffId,
}

impl FillStuff {
    /// Create the action for a container.
    pub const fn new(stuff_id: StuffId) -> Self {
        Self { stuff_id }
    }

    fn container<'c>(
        &self,
        context: &'c EconomyContext,
        store: &dyn Store,
        actor: &Character,
    ) -> Result<(Stuff, &'c StuffConfig, Decimal), ActionError> {
        let stuff = store.stuff(self.stuff_id).map_err(ActionError::from_requested)?;
        if stuff.location != StorageLocation::Inventory(actor.id) {
            return Err(ActionError::impossible("You do not carry this object"));
        }
        let config = context.stuff(&stuff.stuff_type)?;
        let Some(capacity) = config.filled_capacity else {
            return Err(ActionError::impossible(format!(
                "{} cannot be filled",
                config.name
            )));
        };
        Ok((stuff, config, capacity))
    }
}

/// Room left in a container.
fn missing_capacity(stuff: &Stuff, capacity: Decimal) -> Decimal {
    capacity
        .saturating_sub(stuff.filled_value.unwrap_or(Decimal::ZERO))
        .max(Decimal::ZERO)
}

impl Action for FillStuff {
    type Input = FillInput;

    fn action_type(&self) -> ActionType {
        ActionType::FillStuff
    }

    fn check_is_possible(
        &self,
        context: &EconomyContext,
        store: &dyn Store,
        actor: &Character,
    ) -> Result<(), ActionError> {
        check_actor_alive(actor)?;
        self.container(context, store, actor).map(|_| ())
    }

    fn get_cost(
        &self,
        context: &EconomyContext,
        _store: &dyn Store,
        _actor: &Character,
        input: &FillInput,
    ) -> Option<Decimal> {
        input
            .resource_id
            .as_ref()
            .map(|_| context.config().actions.cost_of(ActionType::FillStuff))
    }

    fn check_request_is_possible(
        &self,
        context: &EconomyContext,
        store: &dyn Store,
        actor: &Character,
        input: &FillInput,
    ) -> Result<(), ActionError> {
        check_actor_alive(actor)?;
        let (stuff, config, capacity) = self.container(context, store, actor)?;
        let Some(resource_id) = &input.resource_id else {
            return Ok(());
        };
        let resource = context.requested_resource(resource_id)?;
        if !config.fill_accepts.contains(resource_id) {
            return Err(ActionError::wrong_input(format!(
                "{} cannot be filled with {}",
                config.name, resource.name
            )));
        }
        if let Some(current) = &stuff.filled_with_resource
            && current != resource_id
        {
            return Err(ActionError::impossible(format!(
                "{} already contains something else",
                config.name
            )));
        }
        let missing = missing_capacity(&stuff, capacity);
        if missing.is_zero() {
            return Err(ActionError::impossible(format!("{} is full", config.name)));
        }
        let available = Resolver::new(context, actor, TransferKind::Use)
            .available_quantity(store, resource_id)?;
        if available.is_zero() {
            return Err(ActionError::NotEnoughResource {
                resource_id: resource_id.clone(),
                name: resource.name.clone(),
                unit: resource.unit,
                required: missing,
                available,
            });
        }
        Ok(())
    }

    fn perform(
        &self,
        context: &EconomyContext,
        store: &mut dyn Store,
        actor: &Character,
        input: &FillInput,
    ) -> Result<Outcome, ActionError> {
        let (stuff, config, capacity) = self.container(context, &*store, actor)?;
        let resolver = Resolver::new(context, actor, TransferKind::Use);
        let title = format!("{} {}", action_label(ActionType::FillStuff), config.name);

        let Some(resource_id) = &input.resource_id else {
            let mut description = Description::new(title);
            for accepted in &config.fill_accepts {
                let available = resolver.available_quantity(&*store, accepted)?;
                if available.is_zero() {
                    continue;
                }
                let resource = context.resource(accepted)?;
                description = description.with_part(Part::Link {
                    label: format!(
                        "{} ({})",
                        resource.name,
                        format_quantity(available, resource.unit)
                    ),
                    params: json!({ "resource_id": accepted }),
                });
            }
            if description.parts.is_empty() {
                description = description.with_text("Nothing around to fill it with");
            }
            return Ok(Outcome::NeedsMoreInput(description));
        };

        let resource = context.requested_resource(resource_id)?;
        let available = resolver.available_quantity(&*store, resource_id)?;
        let amount = missing_capacity(&stuff, capacity).min(available);
        if amount <= Decimal::ZERO {
            return Err(ActionError::impossible(format!(
                "Cannot fill {} with {}",
                config.name, resource.name
            )));
        }
        let filled = stuff
            .filled_value
            .unwrap_or(Decimal::ZERO)
            .checked_add(amount)
            .ok_or_else(|| ActionError::ArithmeticOverflow {
                context: format!("filling {}", self.stuff_id),
            })?;
        let sources = resolver.resource_sources(&*store)?;
        let cost = context.config().actions.cost_of(ActionType::FillStuff);

        let reductions = commit_with_cost(store, actor.id, cost, |store| {
            let reductions =
                reduce_across_locations(store, context, &sources, resource_id, amount)?;
            store.set_stuff_filling(self.stuff_id, Some(resource_id.clone()), Some(filled))?;
            Ok(reductions)
        })?;

        tracing::debug!(
            stuff_id = %self.stuff_id,
            %resource_id,
            %amount,
            "Container filled"
        );
        let description = Description::new(title).with_text(format!(
            "{} of {} added",
            format_quantity(amount, resource.unit),
            resource.name
        ));
        let mut completion = Completion::new(ActionType::FillStuff, cost, description);
        completion.reductions = reductions;
        Ok(Outcome::Completed(Box::new(completion)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolling_core::GameConfig;
    use rolling_store::{MemoryAffinities, MemoryStore};
    use rolling_types::{CharacterId, GroundPoint, StuffType};
    use rust_decimal_macros::dec;

    const HERE: GroundPoint = GroundPoint::new(0, 0, 0, 0);

    fn context() -> EconomyContext {
        let yaml = r"
resources:
  FRESH_WATER: { name: Eau potable, unit: litre, drop_to_nowhere: true }
  SALT_WATER: { name: Eau salee, unit: litre }
stuffs:
  PLASTIC_BOTTLE_1L:
    name: Bouteille plastique
    filled_capacity: 1
    fill_accepts: [FRESH_WATER, SALT_WATER]
  STONE_HAXE: { name: Hache de pierre }
";
        EconomyContext::new(
            GameConfig::parse(yaml).unwrap_or_default(),
            MemoryAffinities::new(),
        )
    }

    fn world(stuff_type: &str) -> (MemoryStore, Character, Stuff) {
        let actor = Character {
            id: CharacterId::new(),
            name: "Alice".to_owned(),
            action_points: dec!(3),
            vulnerable: false,
            alive: true,
            position: HERE,
        };
        let bottle = Stuff {
            id: StuffId::new(),
            stuff_type: StuffType::from(stuff_type),
            location: StorageLocation::Inventory(actor.id),
            filled_with_resource: None,
            filled_value: None,
            equipped: None,
        };
        let mut store = MemoryStore::new();
        store.insert_character(actor.clone());
        store.insert_stuff(bottle.clone());
        (store, actor, bottle)
    }

    fn fresh_water() -> ResourceId {
        ResourceId::from("FRESH_WATER")
    }

    #[test]
    fn fills_up_to_capacity_from_the_ground() {
        let context = context();
        let (mut store, actor, bottle) = world("PLASTIC_BOTTLE_1L");
        assert!(
            store
                .add_resource(&StorageLocation::Ground(HERE), &fresh_water(), dec!(5))
                .is_ok()
        );
        let fill = FillStuff::new(bottle.id);
        let input = FillInput {
            resource_id: Some(fresh_water()),
        };

        assert!(
            fill.check_request_is_possible(&context, &store, &actor, &input)
                .is_ok()
        );
        let outcome = fill.perform(&context, &mut store, &actor, &input);

        assert!(outcome.is_ok_and(|o| o.completion().is_some()));
        let filled = store.stuff(bottle.id).ok();
        assert_eq!(
            filled.as_ref().and_then(|s| s.filled_with_resource.clone()),
            Some(fresh_water())
        );
        assert_eq!(filled.and_then(|s| s.filled_value), Some(dec!(1)));
        assert_eq!(
            store.resource_quantity(&StorageLocation::Ground(HERE), &fresh_water()),
            dec!(4)
        );
    }

    #[test]
    fn partial_fill_takes_what_is_there() {
        let context = context();
        let (mut store, actor, bottle) = world("PLASTIC_BOTTLE_1L");
        assert!(
            store
                .add_resource(&StorageLocation::Inventory(actor.id), &fresh_water(), dec!(0.3))
                .is_ok()
        );
        let fill = FillStuff::new(bottle.id);
        let input = FillInput {
            resource_id: Some(fresh_water()),
        };

        assert!(fill.perform(&context, &mut store, &actor, &input).is_ok());

        assert_eq!(
            store.stuff(bottle.id).ok().and_then(|s| s.filled_value),
            Some(dec!(0.3))
        );
    }

    #[test]
    fn container_holding_another_resource_is_refused() {
        let context = context();
        let (mut store, actor, mut bottle) = world("PLASTIC_BOTTLE_1L");
        bottle.filled_with_resource = Some(ResourceId::from("SALT_WATER"));
        bottle.filled_value = Some(dec!(0.5));
        store.insert_stuff(bottle.clone());
        assert!(
            store
                .add_resource(&StorageLocation::Ground(HERE), &fresh_water(), dec!(5))
                .is_ok()
        );
        let input = FillInput {
            resource_id: Some(fresh_water()),
        };

        let result =
            FillStuff::new(bottle.id).check_request_is_possible(&context, &store, &actor, &input);
        assert!(matches!(result, Err(ActionError::Impossible { .. })));
    }

    #[test]
    fn non_container_cannot_be_filled() {
        let context = context();
        let (store, actor, axe) = world("STONE_HAXE");
        let result = FillStuff::new(axe.id).check_is_possible(&context, &store, &actor);
        assert!(matches!(result, Err(ActionError::Impossible { .. })));
    }
}
