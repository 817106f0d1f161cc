//! Bringing resources to a build under construction.

use rolling_core::RequiredResource;
use rolling_store::Store;
use rolling_types::{
    ActionType, Build, BuildId, Character, Description, FormField, Part, ResourceId,
    StorageLocation,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use super::{Action, Completion, Outcome, action_label, check_actor_alive, commit_with_cost};
use crate::availability::{Resolver, TransferKind, co_located_build};
use crate::context::EconomyContext;
use crate::error::ActionError;
use crate::quantity::{format_quantity, parse_user_quantity, unit_label};
use crate::transfer::{ResourceMove, transfer_resource};

/// Parameters of a bring request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BringInput {
    /// Resource to bring.
    pub resource_id: Option<ResourceId>,
    /// Typed quantity in the resource's unit.
    pub quantity: Option<String>,
}

/// Bring resources to one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BringResourceOnBuild {
    /// The build under construction.
    pub build_id: BuildId,
}

impl BringResourceOnBuild {
    /// Create the action for a build.
    pub const fn new(build_id: BuildId) -> Self {
        Self { build_id }
    }

    fn site(&self, store: &dyn Store, actor: &Character) -> Result<Build, ActionError> {
        let build = co_located_build(store, actor, self.build_id)?;
        if !build.under_construction {
            return Err(ActionError::impossible("This build is already finished"));
        }
        Ok(build)
    }

    /// Quantity of a required resource still missing from the site.
    fn still_needed(&self, store: &dyn Store, requirement: &RequiredResource) -> Decimal {
        let brought = store.resource_quantity(
            &StorageLocation::Build(self.build_id),
            &requirement.resource_id,
        );
        requirement
            .quantity
            .saturating_sub(brought)
            .max(Decimal::ZERO)
    }
}

fn find_requirement<'c>(
    context: &'c EconomyContext,
    build: &Build,
    resource_id: &ResourceId,
) -> Result<&'c RequiredResource, ActionError> {
    context
        .build_config(build)?
        .required_resources
        .iter()
        .find(|r| &r.resource_id == resource_id)
        .ok_or_else(|| ActionError::wrong_input(format!("This build does not need {resource_id}")))
}

impl Action for BringResourceOnBuild {
    type Input = BringInput;

    fn action_type(&self) -> ActionType {
        ActionType::BringResourceOnBuild
    }

    fn check_is_possible(
        &self,
        context: &EconomyContext,
        store: &dyn Store,
        actor: &Character,
    ) -> Result<(), ActionError> {
        check_actor_alive(actor)?;
        let build = self.site(store, actor)?;
        if context.build_config(&build)?.required_resources.is_empty() {
            return Err(ActionError::impossible("This build needs nothing"));
        }
        Ok(())
    }

    fn get_cost(
        &self,
        context: &EconomyContext,
        _store: &dyn Store,
        _actor: &Character,
        input: &BringInput,
    ) -> Option<Decimal> {
        (input.resource_id.is_some() && input.quantity.is_some())
            .then(|| context.config().actions.cost_of(ActionType::BringResourceOnBuild))
    }

    fn check_request_is_possible(
        &self,
        context: &EconomyContext,
        store: &dyn Store,
        actor: &Character,
        input: &BringInput,
    ) -> Result<(), ActionError> {
        self.check_is_possible(context, store, actor)?;
        let Some(resource_id) = &input.resource_id else {
            return Ok(());
        };
        let build = self.site(store, actor)?;
        let requirement = find_requirement(context, &build, resource_id)?;
        let resource = context.requested_resource(resource_id)?;
        let needed = self.still_needed(store, requirement);
        if needed.is_zero() {
            return Err(ActionError::impossible(format!(
                "Enough {} has already been brought",
                resource.name
            )));
        }

        let Some(raw) = &input.quantity else {
            return Ok(());
        };
        let requested = parse_user_quantity(raw, resource.unit)?.quantity;
        if requested > needed {
            return Err(ActionError::wrong_input(format!(
                "Only {} of {} is still needed",
                format_quantity(needed, resource.unit),
                resource.name
            )));
        }
        let available = Resolver::new(context, actor, TransferKind::Use)
            .available_quantity(store, resource_id)?;
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

    fn perform(
        &self,
        context: &EconomyContext,
        store: &mut dyn Store,
        actor: &Character,
        input: &BringInput,
    ) -> Result<Outcome, ActionError> {
        let build = self.site(&*store, actor)?;
        let build_name = context.build_config(&build)?.name.clone();
        let title = format!("{}: {build_name}", action_label(ActionType::BringResourceOnBuild));
        let resolver = Resolver::new(context, actor, TransferKind::Use);

        let Some(resource_id) = &input.resource_id else {
            let mut description = Description::new(title);
            for requirement in &context.build_config(&build)?.required_resources {
                let resource = context.resource(&requirement.resource_id)?;
                let needed = self.still_needed(&*store, requirement);
                if needed.is_zero() {
                    continue;
                }
                let available = resolver.available_quantity(&*store, &requirement.resource_id)?;
                description = description.with_part(Part::Link {
                    label: format!(
                        "{}: {} needed, {} available",
                        resource.name,
                        format_quantity(needed, resource.unit),
                        format_quantity(available, resource.unit)
                    ),
                    params: json!({ "resource_id": requirement.resource_id }),
                });
            }
            if description.parts.is_empty() {
                description = description.with_text("Everything has been brought");
            }
            return Ok(Outcome::NeedsMoreInput(description));
        };

        let requirement = find_requirement(context, &build, resource_id)?;
        let resource = context.requested_resource(resource_id)?;
        let needed = self.still_needed(&*store, requirement);

        let Some(raw) = &input.quantity else {
            let available = resolver.available_quantity(&*store, resource_id)?;
            let suggested = needed.min(available);
            let description = Description::new(title).with_part(Part::Form {
                params: json!({ "resource_id": resource_id }),
                fields: vec![FormField {
                    name: "quantity".to_owned(),
                    label: format!(
                        "Quantity of {} ({} needed, {} available)",
                        resource.name,
                        format_quantity(needed, resource.unit),
                        format_quantity(available, resource.unit)
                    ),
                    default_value: Some(format_quantity(suggested, resource.unit)),
                    unit_label: unit_label(resource.unit).map(str::to_owned),
                }],
            });
            return Ok(Outcome::NeedsMoreInput(description));
        };

        let parsed = parse_user_quantity(raw, resource.unit)?;
        if parsed.quantity > needed {
            return Err(ActionError::wrong_input(format!(
                "Only {} of {} is still needed",
                format_quantity(needed, resource.unit),
                resource.name
            )));
        }
        let params = ResourceMove {
            from: resolver.resource_sources(&*store)?,
            to: StorageLocation::Build(self.build_id),
            resource_id: resource_id.clone(),
            quantity: parsed.quantity,
            audit: None,
        };
        let cost = context.config().actions.cost_of(ActionType::BringResourceOnBuild);
        let reductions = commit_with_cost(store, actor.id, cost, |store| {
            transfer_resource(store, context, &params)
        })?;

        let description = Description::new(title)
            .with_text(format!("{} of {} brought", parsed.display, resource.name));
        let mut completion = Completion::new(ActionType::BringResourceOnBuild, cost, description);
        completion.reductions = reductions;
        Ok(Outcome::Completed(Box::new(completion)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolling_core::GameConfig;
    use rolling_store::{MemoryAffinities, MemoryStore};
    use rolling_types::{CharacterId, GroundPoint};
    use rust_decimal_macros::dec;

    const HERE: GroundPoint = GroundPoint::new(2, 2, 1, 1);

    fn context() -> EconomyContext {
        let yaml = r"
resources:
  WOOD: { name: Bois, unit: gram }
  STONE: { name: Pierre, unit: gram }
builds:
  WOOD_FENCE:
    name: Palissade
    required_resources:
      - resource_id: WOOD
        quantity: 2000
";
        EconomyContext::new(
            GameConfig::parse(yaml).unwrap_or_default(),
            MemoryAffinities::new(),
        )
    }

    fn world() -> (MemoryStore, Character, Build) {
        let actor = Character {
            id: CharacterId::new(),
            name: "Alice".to_owned(),
            action_points: dec!(3),
            vulnerable: false,
            alive: true,
            position: HERE,
        };
        let fence = Build {
            id: BuildId::new(),
            build_type: "WOOD_FENCE".to_owned(),
            position: HERE,
            under_construction: true,
        };
        let mut store = MemoryStore::new();
        store.insert_character(actor.clone());
        store.insert_build(fence.clone());
        assert!(
            store
                .add_resource(
                    &StorageLocation::Inventory(actor.id),
                    &ResourceId::from("WOOD"),
                    dec!(5000)
                )
                .is_ok()
        );
        (store, actor, fence)
    }

    fn bring(quantity: Option<&str>) -> BringInput {
        BringInput {
            resource_id: Some(ResourceId::from("WOOD")),
            quantity: quantity.map(str::to_owned),
        }
    }

    #[test]
    fn brings_resources_and_counts_them() {
        let context = context();
        let (mut store, actor, fence) = world();
        let action = BringResourceOnBuild::new(fence.id);

        let outcome = action.perform(&context, &mut store, &actor, &bring(Some("1.5kg")));

        assert!(outcome.is_ok_and(|o| o.completion().is_some()));
        assert_eq!(
            store.resource_quantity(
                &StorageLocation::Build(fence.id),
                &ResourceId::from("WOOD")
            ),
            dec!(1500)
        );
        assert_eq!(
            store.character(actor.id).ok().map(|c| c.action_points),
            Some(dec!(2))
        );
    }

    #[test]
    fn cannot_bring_more_than_needed() {
        let context = context();
        let (store, actor, fence) = world();
        let action = BringResourceOnBuild::new(fence.id);

        let result =
            action.check_request_is_possible(&context, &store, &actor, &bring(Some("3kg")));

        assert!(matches!(result, Err(ActionError::WrongInput { .. })));
    }

    #[test]
    fn default_is_what_remains_needed() {
        let context = context();
        let (mut store, actor, fence) = world();
        let action = BringResourceOnBuild::new(fence.id);

        let outcome = action.perform(&context, &mut store, &actor, &bring(None));

        let suggested = match outcome {
            Ok(Outcome::NeedsMoreInput(description)) => {
                description.parts.into_iter().find_map(|part| match part {
                    Part::Form { fields, .. } => {
                        fields.into_iter().next().and_then(|f| f.default_value)
                    }
                    Part::Text { .. } | Part::Link { .. } => None,
                })
            }
            _ => None,
        };
        assert_eq!(suggested, Some("2 kg".to_owned()));
    }

    #[test]
    fn unneeded_resource_is_wrong_input() {
        let context = context();
        let (store, actor, fence) = world();
        let input = BringInput {
            resource_id: Some(ResourceId::from("STONE")),
            quantity: None,
        };

        let result = BringResourceOnBuild::new(fence.id)
            .check_request_is_possible(&context, &store, &actor, &input);

        assert!(matches!(result, Err(ActionError::WrongInput { .. })));
    }

    #[test]
    fn finished_build_refuses_resources() {
        let context = context();
        let (mut store, actor, mut fence) = world();
        fence.under_construction = false;
        store.insert_build(fence.clone());

        let result =
            BringResourceOnBuild::new(fence.id).check_is_possible(&context, &store, &actor);

        assert!(matches!(result, Err(ActionError::Impossible { .. })));
    }
}
