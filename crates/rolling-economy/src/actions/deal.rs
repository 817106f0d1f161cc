//! Accepting a business offer.

use rolling_store::Store;
use rolling_types::{
    ActionType, Character, Description, Offer, OfferId, OfferItem, OfferItemPosition,
    OfferOperand, Part, TradeItem,
};
use rust_decimal::Decimal;
use serde_json::json;

use super::{Action, Completion, Outcome, action_label, check_actor_alive, commit_with_cost};
use crate::business::{DealChoice, check_offer_acceptable, have_item, make_deal, resolve_side};
use crate::context::EconomyContext;
use crate::error::ActionError;
use crate::quantity::format_quantity;

/// Accept one offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MakeDeal {
    /// The offer to accept.
    pub offer_id: OfferId,
}

impl MakeDeal {
    /// Create the action for an offer.
    pub const fn new(offer_id: OfferId) -> Self {
        Self { offer_id }
    }
}

/// Whether every non-empty `OR` side has a choice.
fn choices_complete(offer: &Offer, choice: &DealChoice) -> bool {
    let needs = |position: OfferItemPosition, operand: OfferOperand| {
        operand == OfferOperand::Or && offer.items.iter().any(|i| i.position == position)
    };
    let request_ready =
        !needs(OfferItemPosition::Request, offer.request_operand) || choice.request_item_id.is_some();
    let offer_ready =
        !needs(OfferItemPosition::Offer, offer.offer_operand) || choice.offer_item_id.is_some();
    request_ready && offer_ready
}

/// Player-facing label of an offer item.
///
/// # Errors
///
/// Returns [`ActionError::UnknownResource`] or
/// [`ActionError::UnknownStuffType`] for unconfigured items.
pub fn item_label(context: &EconomyContext, item: &OfferItem) -> Result<String, ActionError> {
    Ok(match &item.item {
        TradeItem::Resource(id) => {
            let resource = context.resource(id)?;
            format!("{} {}", format_quantity(item.quantity, resource.unit), resource.name)
        }
        TradeItem::Stuff(stuff_type) => {
            format!("{} {}", item.quantity.normalize(), context.stuff(stuff_type)?.name)
        }
    })
}

impl Action for MakeDeal {
    type Input = DealChoice;

    fn action_type(&self) -> ActionType {
        ActionType::MakeDeal
    }

    fn check_is_possible(
        &self,
        _context: &EconomyContext,
        store: &dyn Store,
        actor: &Character,
    ) -> Result<(), ActionError> {
        check_actor_alive(actor)?;
        let offer = store.offer(self.offer_id).map_err(ActionError::from_requested)?;
        check_offer_acceptable(actor, &offer)
    }

    fn get_cost(
        &self,
        context: &EconomyContext,
        store: &dyn Store,
        _actor: &Character,
        input: &DealChoice,
    ) -> Option<Decimal> {
        let offer = store.offer(self.offer_id).ok()?;
        choices_complete(&offer, input)
            .then(|| context.config().actions.cost_of(ActionType::MakeDeal))
    }

    fn check_request_is_possible(
        &self,
        context: &EconomyContext,
        store: &dyn Store,
        actor: &Character,
        input: &DealChoice,
    ) -> Result<(), ActionError> {
        self.check_is_possible(context, store, actor)?;
        let offer = store.offer(self.offer_id).map_err(ActionError::from_requested)?;
        if !choices_complete(&offer, input) {
            return Ok(());
        }

        for item in resolve_side(&offer, OfferItemPosition::Request, input.request_item_id)? {
            if !have_item(store, actor.id, &item) {
                return Err(ActionError::wrong_input(format!(
                    "You do not have {}",
                    item_label(context, &item)?
                )));
            }
        }
        for item in resolve_side(&offer, OfferItemPosition::Offer, input.offer_item_id)? {
            if !have_item(store, offer.owner, &item) {
                return Err(ActionError::impossible(format!(
                    "The owner of this offer no longer has {}",
                    item_label(context, &item)?
                )));
            }
        }
        Ok(())
    }

    fn perform(
        &self,
        context: &EconomyContext,
        store: &mut dyn Store,
        actor: &Character,
        input: &DealChoice,
    ) -> Result<Outcome, ActionError> {
        let offer = store.offer(self.offer_id).map_err(ActionError::from_requested)?;
        let title = format!("{}: {}", action_label(ActionType::MakeDeal), offer.title);

        if !choices_complete(&offer, input) {
            let mut description = Description::new(title);
            let pending = [
                (
                    OfferItemPosition::Request,
                    offer.request_operand,
                    input.request_item_id.is_none(),
                    "request_item_id",
                    "You give",
                ),
                (
                    OfferItemPosition::Offer,
                    offer.offer_operand,
                    input.offer_item_id.is_none(),
                    "offer_item_id",
                    "You receive",
                ),
            ];
            for (position, operand, missing, field, heading) in pending {
                if operand != OfferOperand::Or || !missing {
                    continue;
                }
                description = description.with_text(format!("{heading} one of:"));
                for item in offer.items.iter().filter(|i| i.position == position) {
                    let mut params = serde_json::to_value(input).map_err(|e| {
                        ActionError::wrong_input(format!("Invalid deal choice ({e})"))
                    })?;
                    if let Some(map) = params.as_object_mut() {
                        map.insert(field.to_owned(), json!(item.id));
                    }
                    description = description.with_part(Part::Link {
                        label: item_label(context, item)?,
                        params,
                    });
                }
            }
            return Ok(Outcome::NeedsMoreInput(description));
        }

        let cost = context.config().actions.cost_of(ActionType::MakeDeal);
        let summary = commit_with_cost(store, actor.id, cost, |store| {
            make_deal(store, context, actor, self.offer_id, input)
        })?;

        let mut description = Description::new(title);
        for item in &summary.given {
            description = description.with_text(format!("Given: {}", item_label(context, item)?));
        }
        for item in &summary.received {
            description =
                description.with_text(format!("Received: {}", item_label(context, item)?));
        }
        let mut completion = Completion::new(ActionType::MakeDeal, cost, description);
        completion.deal = Some(summary);
        Ok(Outcome::Completed(Box::new(completion)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolling_core::GameConfig;
    use rolling_store::{MemoryAffinities, MemoryStore};
    use rolling_types::{
        CharacterId, GroundPoint, OfferItemId, OfferStatus, ResourceId, StorageLocation,
    };
    use rust_decimal_macros::dec;

    fn context() -> EconomyContext {
        let yaml = r"
resources:
  WOOD: { name: Bois, unit: gram }
  STONE: { name: Pierre, unit: gram }
";
        EconomyContext::new(
            GameConfig::parse(yaml).unwrap_or_default(),
            MemoryAffinities::new(),
        )
    }

    fn character(name: &str) -> Character {
        Character {
            id: CharacterId::new(),
            name: name.to_owned(),
            action_points: dec!(2),
            vulnerable: false,
            alive: true,
            position: GroundPoint::new(0, 0, 0, 0),
        }
    }

    fn resource_item(position: OfferItemPosition, resource: &str, quantity: Decimal) -> OfferItem {
        OfferItem {
            id: OfferItemId::new(),
            position,
            item: TradeItem::Resource(ResourceId::from(resource)),
            quantity,
        }
    }

    fn either_offer(owner: CharacterId) -> Offer {
        Offer {
            id: OfferId::new(),
            owner,
            title: "Stone for anything".to_owned(),
            request_operand: OfferOperand::Or,
            offer_operand: OfferOperand::And,
            permanent: true,
            with_character: None,
            status: OfferStatus::Open,
            items: vec![
                resource_item(OfferItemPosition::Request, "WOOD", dec!(100)),
                resource_item(OfferItemPosition::Request, "STONE", dec!(100)),
                resource_item(OfferItemPosition::Offer, "STONE", dec!(50)),
            ],
        }
    }

    #[test]
    fn or_side_without_choice_asks_for_one() {
        let context = context();
        let owner = character("Owner");
        let buyer = character("Buyer");
        let offer = either_offer(owner.id);
        let mut store = MemoryStore::new();
        store.insert_character(owner.clone());
        store.insert_character(buyer.clone());
        store.insert_offer(offer.clone());
        let action = MakeDeal::new(offer.id);

        assert_eq!(
            action.get_cost(&context, &store, &buyer, &DealChoice::default()),
            None
        );
        let outcome = action.perform(&context, &mut store, &buyer, &DealChoice::default());

        let links = match outcome {
            Ok(Outcome::NeedsMoreInput(description)) => description
                .parts
                .iter()
                .filter(|p| matches!(p, Part::Link { .. }))
                .count(),
            _ => 0,
        };
        assert_eq!(links, 2);
    }

    #[test]
    fn chosen_item_is_exchanged_and_cost_debited() {
        let context = context();
        let owner = character("Owner");
        let buyer = character("Buyer");
        let offer = either_offer(owner.id);
        let mut store = MemoryStore::new();
        store.insert_character(owner.clone());
        store.insert_character(buyer.clone());
        store.insert_offer(offer.clone());
        let wood = ResourceId::from("WOOD");
        let stone = ResourceId::from("STONE");
        assert!(
            store
                .add_resource(&StorageLocation::Inventory(buyer.id), &wood, dec!(100))
                .is_ok()
        );
        assert!(
            store
                .add_resource(&StorageLocation::Inventory(owner.id), &stone, dec!(50))
                .is_ok()
        );
        let choice = DealChoice {
            request_item_id: offer.items.first().map(|i| i.id),
            offer_item_id: None,
        };
        let action = MakeDeal::new(offer.id);

        assert_eq!(
            action.get_cost(&context, &store, &buyer, &choice),
            Some(dec!(0.5))
        );
        assert!(
            action
                .check_request_is_possible(&context, &store, &buyer, &choice)
                .is_ok()
        );
        let outcome = action.perform(&context, &mut store, &buyer, &choice);

        assert!(outcome.is_ok_and(|o| o.completion().is_some_and(|c| c.deal.is_some())));
        assert_eq!(
            store.resource_quantity(&StorageLocation::Inventory(owner.id), &wood),
            dec!(100)
        );
        assert_eq!(
            store.resource_quantity(&StorageLocation::Inventory(buyer.id), &stone),
            dec!(50)
        );
        assert_eq!(
            store.character(buyer.id).ok().map(|c| c.action_points),
            Some(dec!(1.5))
        );
        assert_eq!(store.ledger().len(), 2);
    }

    #[test]
    fn missing_request_item_is_wrong_input() {
        let context = context();
        let owner = character("Owner");
        let buyer = character("Buyer");
        let offer = either_offer(owner.id);
        let mut store = MemoryStore::new();
        store.insert_character(owner.clone());
        store.insert_offer(offer.clone());
        let choice = DealChoice {
            request_item_id: offer.items.get(1).map(|i| i.id),
            offer_item_id: None,
        };

        let result =
            MakeDeal::new(offer.id).check_request_is_possible(&context, &store, &buyer, &choice);

        assert!(matches!(result, Err(ActionError::WrongInput { .. })));
    }
}
