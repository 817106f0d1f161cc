//! Deal matching.
//!
//! An [`Offer`] has a request side (what the owner wants) and an offer
//! side (what the owner gives), each combined with `AND` or `OR`. An empty
//! side is always satisfied. Accepting an offer moves every resolved item
//! between the two inventories in one savepoint.

use rolling_store::{Store, atomically};
use rolling_types::{
    Character, CharacterId, LedgerEntryType, Offer, OfferId, OfferItem, OfferItemId,
    OfferItemPosition, OfferOperand, OfferStatus, StorageLocation, TradeItem,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::context::EconomyContext;
use crate::error::ActionError;
use crate::quantity::decimal_to_count;
use crate::transfer::{Audit, ResourceMove, StuffMove, transfer_resource, transfer_stuffs};

/// Ledger reason of deal transfers.
pub const DEAL_REASON: &str = "DEAL";

/// Items picked on `OR` sides of an offer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealChoice {
    /// Chosen request item, when the request side is `OR`.
    #[serde(default)]
    pub request_item_id: Option<OfferItemId>,
    /// Chosen offer item, when the offer side is `OR`.
    #[serde(default)]
    pub offer_item_id: Option<OfferItemId>,
}

/// What a completed deal exchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DealSummary {
    /// The offer accepted.
    pub offer_id: OfferId,
    /// Items the accepting character handed to the owner.
    pub given: Vec<OfferItem>,
    /// Items the owner handed to the accepting character.
    pub received: Vec<OfferItem>,
    /// Status of the offer after the deal.
    pub status: OfferStatus,
}

/// Whether `character` carries one offer item.
///
/// Counts the inventory only; stuff quantities are compared as counts.
pub fn have_item(store: &dyn Store, character: CharacterId, item: &OfferItem) -> bool {
    let inventory = StorageLocation::Inventory(character);
    match &item.item {
        TradeItem::Resource(id) => store.resource_quantity(&inventory, id) >= item.quantity,
        TradeItem::Stuff(stuff_type) => {
            let held = store
                .stuffs_at(&inventory)
                .iter()
                .filter(|s| &s.stuff_type == stuff_type)
                .count();
            Decimal::from(held) >= item.quantity
        }
    }
}

/// Whether `character` can give what the offer requests.
pub fn character_can_deal(store: &dyn Store, character: CharacterId, offer: &Offer) -> bool {
    side_satisfied(
        offer.request_items(),
        offer.request_operand,
        |item| have_item(store, character, item),
    )
}

/// Whether the owner can still give what the offer promises.
pub fn owner_can_deal(store: &dyn Store, offer: &Offer) -> bool {
    side_satisfied(
        offer.offer_items(),
        offer.offer_operand,
        |item| have_item(store, offer.owner, item),
    )
}

fn side_satisfied<'a>(
    items: impl Iterator<Item = &'a OfferItem>,
    operand: OfferOperand,
    have: impl FnMut(&OfferItem) -> bool,
) -> bool {
    let mut items = items.peekable();
    if items.peek().is_none() {
        return true;
    }
    match operand {
        OfferOperand::And => items.all(have),
        OfferOperand::Or => items.any(have),
    }
}

/// Check that `actor` may accept the offer at all.
///
/// # Errors
///
/// Returns [`ActionError::Impossible`] when the offer is not open, belongs
/// to the actor, or is reserved to someone else.
pub fn check_offer_acceptable(actor: &Character, offer: &Offer) -> Result<(), ActionError> {
    if offer.status != OfferStatus::Open {
        return Err(ActionError::impossible(format!(
            "The offer \"{}\" is not open",
            offer.title
        )));
    }
    if offer.owner == actor.id {
        return Err(ActionError::impossible("You cannot accept your own offer"));
    }
    if !offer.permanent && offer.with_character != Some(actor.id) {
        return Err(ActionError::impossible(format!(
            "The offer \"{}\" is not meant for you",
            offer.title
        )));
    }
    Ok(())
}

/// Items of one side that a deal will move, honoring an `OR` choice.
///
/// # Errors
///
/// Returns [`ActionError::WrongInput`] when an `OR` side has no choice or
/// the chosen item is not on that side.
pub fn resolve_side(
    offer: &Offer,
    position: OfferItemPosition,
    choice: Option<OfferItemId>,
) -> Result<Vec<OfferItem>, ActionError> {
    let (items, operand): (Vec<OfferItem>, OfferOperand) = match position {
        OfferItemPosition::Request => (
            offer.request_items().cloned().collect(),
            offer.request_operand,
        ),
        OfferItemPosition::Offer => (offer.offer_items().cloned().collect(), offer.offer_operand),
    };
    if items.is_empty() || operand == OfferOperand::And {
        return Ok(items);
    }

    let Some(chosen) = choice else {
        return Err(ActionError::wrong_input(match position {
            OfferItemPosition::Request => "Choose which item you give",
            OfferItemPosition::Offer => "Choose which item you want",
        }));
    };
    items
        .into_iter()
        .find(|item| item.id == chosen)
        .map(|item| vec![item])
        .ok_or_else(|| ActionError::wrong_input("The chosen item is not part of this offer"))
}

/// Accept an offer: the actor gives the request side, the owner gives the
/// offer side.
///
/// One-off offers become [`OfferStatus::Accepted`]; permanent offers stay
/// open. Nothing moves unless everything does.
///
/// # Errors
///
/// Returns [`ActionError::Impossible`] when the offer cannot be accepted,
/// [`ActionError::WrongInput`] for a missing `OR` choice, or a
/// `NotEnough*` error when either party lacks an item.
pub fn make_deal(
    store: &mut dyn Store,
    context: &EconomyContext,
    actor: &Character,
    offer_id: OfferId,
    choice: &DealChoice,
) -> Result<DealSummary, ActionError> {
    let offer = store.offer(offer_id).map_err(ActionError::from_requested)?;
    check_offer_acceptable(actor, &offer)?;
    let owner = store.character(offer.owner)?;
    if !owner.alive {
        return Err(ActionError::impossible(format!("{} is dead", owner.name)));
    }

    let given = resolve_side(&offer, OfferItemPosition::Request, choice.request_item_id)?;
    let received = resolve_side(&offer, OfferItemPosition::Offer, choice.offer_item_id)?;
    let audit =
        Audit::new(LedgerEntryType::Deal, DEAL_REASON).with_reference(offer.id.into_inner());

    atomically(store, |store| {
        for item in &given {
            hand_over(store, context, item, actor.id, offer.owner, &audit)?;
        }
        for item in &received {
            hand_over(store, context, item, offer.owner, actor.id, &audit)?;
        }

        let status = if offer.permanent {
            offer.status
        } else {
            store.set_offer_status(offer.id, OfferStatus::Accepted)?;
            OfferStatus::Accepted
        };

        tracing::info!(
            offer_id = %offer.id,
            owner = %offer.owner,
            actor = %actor.id,
            given = given.len(),
            received = received.len(),
            "Deal made"
        );
        Ok(DealSummary {
            offer_id: offer.id,
            given: given.clone(),
            received: received.clone(),
            status,
        })
    })
}

fn hand_over(
    store: &mut dyn Store,
    context: &EconomyContext,
    item: &OfferItem,
    from: CharacterId,
    to: CharacterId,
    audit: &Audit,
) -> Result<(), ActionError> {
    match &item.item {
        TradeItem::Resource(resource_id) => {
            transfer_resource(
                store,
                context,
                &ResourceMove {
                    from: vec![StorageLocation::Inventory(from)],
                    to: StorageLocation::Inventory(to),
                    resource_id: resource_id.clone(),
                    quantity: item.quantity,
                    audit: Some(audit.clone()),
                },
            )?;
        }
        TradeItem::Stuff(stuff_type) => {
            transfer_stuffs(
                store,
                context,
                &StuffMove {
                    from: vec![StorageLocation::Inventory(from)],
                    to: StorageLocation::Inventory(to),
                    stuff_type: stuff_type.clone(),
                    count: decimal_to_count(item.quantity)?,
                    preferred: None,
                    audit: Some(audit.clone()),
                },
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolling_core::GameConfig;
    use rolling_store::{MemoryAffinities, MemoryStore};
    use rolling_types::{GroundPoint, ResourceId};
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
            action_points: dec!(10),
            vulnerable: false,
            alive: true,
            position: GroundPoint::new(0, 0, 0, 0),
        }
    }

    fn item(position: OfferItemPosition, resource: &str, quantity: Decimal) -> OfferItem {
        OfferItem {
            id: OfferItemId::new(),
            position,
            item: TradeItem::Resource(ResourceId::from(resource)),
            quantity,
        }
    }

    fn offer(owner: CharacterId, request_operand: OfferOperand, items: Vec<OfferItem>) -> Offer {
        Offer {
            id: OfferId::new(),
            owner,
            title: "Wood for stone".to_owned(),
            request_operand,
            offer_operand: OfferOperand::And,
            permanent: true,
            with_character: None,
            status: OfferStatus::Open,
            items,
        }
    }

    #[test]
    fn empty_side_is_always_satisfied() {
        let store = MemoryStore::new();
        let owner = CharacterId::new();
        let gift = offer(owner, OfferOperand::And, Vec::new());
        assert!(character_can_deal(&store, CharacterId::new(), &gift));
        assert!(owner_can_deal(&store, &gift));
    }

    #[test]
    fn or_side_needs_only_one_item() {
        let mut store = MemoryStore::new();
        let buyer = CharacterId::new();
        assert!(
            store
                .add_resource(
                    &StorageLocation::Inventory(buyer),
                    &ResourceId::from("STONE"),
                    dec!(5)
                )
                .is_ok()
        );
        let items = vec![
            item(OfferItemPosition::Request, "WOOD", dec!(1)),
            item(OfferItemPosition::Request, "STONE", dec!(5)),
        ];
        let either = offer(CharacterId::new(), OfferOperand::Or, items.clone());
        let both = offer(CharacterId::new(), OfferOperand::And, items);

        assert!(character_can_deal(&store, buyer, &either));
        assert!(!character_can_deal(&store, buyer, &both));
    }

    #[test]
    fn or_side_requires_a_choice() {
        let wood = item(OfferItemPosition::Request, "WOOD", dec!(1));
        let stone = item(OfferItemPosition::Request, "STONE", dec!(1));
        let either = offer(CharacterId::new(), OfferOperand::Or, vec![wood, stone.clone()]);

        assert!(matches!(
            resolve_side(&either, OfferItemPosition::Request, None),
            Err(ActionError::WrongInput { .. })
        ));
        assert!(matches!(
            resolve_side(&either, OfferItemPosition::Request, Some(OfferItemId::new())),
            Err(ActionError::WrongInput { .. })
        ));
        assert_eq!(
            resolve_side(&either, OfferItemPosition::Request, Some(stone.id)).ok(),
            Some(vec![stone])
        );
    }

    #[test]
    fn one_off_offer_is_reserved_and_accepted_once() {
        let context = context();
        let owner = character("Owner");
        let buyer = character("Buyer");
        let stranger = character("Stranger");
        let mut store = MemoryStore::new();
        for c in [&owner, &buyer, &stranger] {
            store.insert_character(c.clone());
        }
        assert!(
            store
                .add_resource(
                    &StorageLocation::Inventory(owner.id),
                    &ResourceId::from("STONE"),
                    dec!(3)
                )
                .is_ok()
        );
        let mut one_off = offer(
            owner.id,
            OfferOperand::And,
            vec![item(OfferItemPosition::Offer, "STONE", dec!(3))],
        );
        one_off.permanent = false;
        one_off.with_character = Some(buyer.id);
        store.insert_offer(one_off.clone());

        let refused = make_deal(&mut store, &context, &stranger, one_off.id, &DealChoice::default());
        assert!(matches!(refused, Err(ActionError::Impossible { .. })));

        let summary = make_deal(&mut store, &context, &buyer, one_off.id, &DealChoice::default());
        assert_eq!(summary.ok().map(|s| s.status), Some(OfferStatus::Accepted));
        assert_eq!(
            store.offer(one_off.id).ok().map(|o| o.status),
            Some(OfferStatus::Accepted)
        );
        assert_eq!(
            store.resource_quantity(
                &StorageLocation::Inventory(buyer.id),
                &ResourceId::from("STONE")
            ),
            dec!(3)
        );

        let again = make_deal(&mut store, &context, &buyer, one_off.id, &DealChoice::default());
        assert!(matches!(again, Err(ActionError::Impossible { .. })));
    }

    #[test]
    fn failed_deal_moves_nothing() {
        let context = context();
        let owner = character("Owner");
        let buyer = character("Buyer");
        let mut store = MemoryStore::new();
        store.insert_character(owner.clone());
        store.insert_character(buyer.clone());
        let buyer_bag = StorageLocation::Inventory(buyer.id);
        assert!(
            store
                .add_resource(&buyer_bag, &ResourceId::from("WOOD"), dec!(2))
                .is_ok()
        );
        let trade = offer(
            owner.id,
            OfferOperand::And,
            vec![
                item(OfferItemPosition::Request, "WOOD", dec!(2)),
                item(OfferItemPosition::Offer, "STONE", dec!(1)),
            ],
        );
        store.insert_offer(trade.clone());

        let result = make_deal(&mut store, &context, &buyer, trade.id, &DealChoice::default());

        assert!(matches!(result, Err(ActionError::NotEnoughResource { .. })));
        assert_eq!(
            store.resource_quantity(&buyer_bag, &ResourceId::from("WOOD")),
            dec!(2)
        );
        assert!(store.ledger().is_empty());
    }

    #[test]
    fn own_offer_cannot_be_accepted() {
        let owner = character("Owner");
        let own = offer(owner.id, OfferOperand::And, Vec::new());
        assert!(check_offer_acceptable(&owner, &own).is_err());
    }
}
