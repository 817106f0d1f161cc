//! Transfer engine.
//!
//! Moves resource quantities and stuffs between storage locations. Every
//! public operation runs inside its own savepoint: either every reduction,
//! addition and audit entry lands, or none does. Callers nest these inside
//! their own savepoint when an action touches several items.

use rolling_ledger::TransferParams;
use rolling_store::{Store, atomically};
use rolling_types::{
    LedgerEntryType, ResourceId, ResourceReduction, StorageLocation, Stuff, StuffId, StuffType,
    TradeItem,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::context::EconomyContext;
use crate::error::ActionError;

/// How cross-character moves are written to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audit {
    /// Ledger entry type.
    pub entry_type: LedgerEntryType,
    /// Short machine reason (`GIVE`, `TAKE_BY_FORCE`, `DEAL`).
    pub reason: String,
    /// Related entity, such as the offer of a deal.
    pub reference_id: Option<Uuid>,
}

impl Audit {
    /// Audit without a reference.
    pub fn new(entry_type: LedgerEntryType, reason: impl Into<String>) -> Self {
        Self {
            entry_type,
            reason: reason.into(),
            reference_id: None,
        }
    }

    /// Attach a reference to the audit.
    #[must_use]
    pub const fn with_reference(mut self, reference_id: Uuid) -> Self {
        self.reference_id = Some(reference_id);
        self
    }
}

/// Parameters for [`transfer_resource`].
#[derive(Debug, Clone)]
pub struct ResourceMove {
    /// Sources, in the order they are drawn from.
    pub from: Vec<StorageLocation>,
    /// Destination.
    pub to: StorageLocation,
    /// Resource to move.
    pub resource_id: ResourceId,
    /// Quantity in base unit.
    pub quantity: Decimal,
    /// Ledger entry written when the move crosses characters.
    pub audit: Option<Audit>,
}

/// Parameters for [`transfer_stuffs`].
#[derive(Debug, Clone)]
pub struct StuffMove {
    /// Sources, in the order they are drawn from.
    pub from: Vec<StorageLocation>,
    /// Destination.
    pub to: StorageLocation,
    /// Kind of stuff to move.
    pub stuff_type: StuffType,
    /// Number of stuffs to move.
    pub count: u32,
    /// Stuff the player selected; moved first when it is in a source.
    pub preferred: Option<StuffId>,
    /// Ledger entry written when the move crosses characters.
    pub audit: Option<Audit>,
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Reduce `quantity` of a resource, drawing from `locations` in order.
///
/// Each location gives what it holds up to the remaining quantity. Nothing
/// is reduced unless the whole quantity is found.
///
/// # Errors
///
/// Returns [`ActionError::NotEnoughResource`] when the locations hold less
/// than `quantity` in total, [`ActionError::WrongInput`] for a quantity that
/// is not positive, or a store error.
pub fn reduce_across_locations(
    store: &mut dyn Store,
    context: &EconomyContext,
    locations: &[StorageLocation],
    resource_id: &ResourceId,
    quantity: Decimal,
) -> Result<Vec<ResourceReduction>, ActionError> {
    if quantity <= Decimal::ZERO {
        return Err(ActionError::wrong_input("Quantity must be greater than zero"));
    }
    let resource = context.resource(resource_id)?;

    atomically(store, |store| {
        let mut remaining = quantity;
        let mut reductions = Vec::new();

        for location in locations {
            if remaining.is_zero() {
                break;
            }
            let held = store.resource_quantity(location, resource_id);
            let wanted = remaining.min(held);
            if wanted <= Decimal::ZERO {
                continue;
            }
            let reduced = store.reduce_resource(location, resource_id, wanted)?;
            if reduced.is_zero() {
                continue;
            }
            remaining = remaining
                .checked_sub(reduced)
                .ok_or_else(|| ActionError::ArithmeticOverflow {
                    context: format!("reducing {resource_id} at {location}"),
                })?;
            reductions.push(ResourceReduction {
                origin: *location,
                resource_id: resource_id.clone(),
                quantity: reduced,
            });
        }

        if remaining > Decimal::ZERO {
            let available = quantity.saturating_sub(remaining);
            tracing::debug!(%resource_id, %quantity, %available, "Not enough resource");
            return Err(ActionError::NotEnoughResource {
                resource_id: resource_id.clone(),
                name: resource.name.clone(),
                unit: resource.unit,
                required: quantity,
                available,
            });
        }

        Ok(reductions)
    })
}

/// Add a quantity of a resource at a location.
///
/// Resources configured with `drop_to_nowhere` vanish instead of landing
/// on the ground.
///
/// # Errors
///
/// Returns [`ActionError::UnknownResource`] or a store error.
pub fn add_resource_to(
    store: &mut dyn Store,
    context: &EconomyContext,
    location: &StorageLocation,
    resource_id: &ResourceId,
    quantity: Decimal,
) -> Result<(), ActionError> {
    let resource = context.resource(resource_id)?;
    if resource.drop_to_nowhere && matches!(location, StorageLocation::Ground(_)) {
        tracing::debug!(%resource_id, %quantity, "Resource poured out");
        return Ok(());
    }
    store.add_resource(location, resource_id, quantity)?;
    Ok(())
}

/// Move a quantity of a resource from ordered sources to a destination.
///
/// Returns the reductions made, in source order.
///
/// # Errors
///
/// Returns [`ActionError::NotEnoughResource`] when the sources hold too
/// little, in which case nothing moves.
pub fn transfer_resource(
    store: &mut dyn Store,
    context: &EconomyContext,
    params: &ResourceMove,
) -> Result<Vec<ResourceReduction>, ActionError> {
    atomically(store, |store| {
        let reductions = reduce_across_locations(
            store,
            context,
            &params.from,
            &params.resource_id,
            params.quantity,
        )?;
        add_resource_to(store, context, &params.to, &params.resource_id, params.quantity)?;

        if let Some(audit) = &params.audit {
            for reduction in &reductions {
                record_audit(
                    store,
                    audit,
                    &reduction.origin,
                    &params.to,
                    TradeItem::Resource(reduction.resource_id.clone()),
                    reduction.quantity,
                )?;
            }
        }

        tracing::debug!(
            resource_id = %params.resource_id,
            quantity = %params.quantity,
            to = %params.to,
            sources = reductions.len(),
            "Resource transferred"
        );
        Ok(reductions)
    })
}

// ---------------------------------------------------------------------------
// Stuffs
// ---------------------------------------------------------------------------

/// Move `count` stuffs of a kind from ordered sources to a destination.
///
/// The preferred stuff goes first, then the others in source order.
/// Returns the moved stuffs as they are after the move.
///
/// # Errors
///
/// Returns [`ActionError::NotEnoughStuff`] when the sources hold fewer
/// stuffs of the kind, in which case nothing moves, or
/// [`ActionError::WrongInput`] for a zero count.
pub fn transfer_stuffs(
    store: &mut dyn Store,
    context: &EconomyContext,
    params: &StuffMove,
) -> Result<Vec<Stuff>, ActionError> {
    if params.count == 0 {
        return Err(ActionError::wrong_input("Number of items must be greater than zero"));
    }

    let mut candidates: Vec<Stuff> = Vec::new();
    if let Some(preferred) = params.preferred {
        let stuff = store.stuff(preferred).map_err(ActionError::from_requested)?;
        if stuff.stuff_type == params.stuff_type && params.from.contains(&stuff.location) {
            candidates.push(stuff);
        }
    }
    for location in &params.from {
        candidates.extend(
            store
                .stuffs_at(location)
                .into_iter()
                .filter(|s| s.stuff_type == params.stuff_type && Some(s.id) != params.preferred),
        );
    }

    let wanted = usize::try_from(params.count).unwrap_or(usize::MAX);
    if candidates.len() < wanted {
        let name = context.stuff(&params.stuff_type)?.name.clone();
        return Err(ActionError::NotEnoughStuff {
            stuff_type: params.stuff_type.clone(),
            name,
            required: params.count,
            available: u32::try_from(candidates.len()).unwrap_or(u32::MAX),
        });
    }
    candidates.truncate(wanted);

    atomically(store, |store| {
        let mut moved = Vec::with_capacity(candidates.len());
        for stuff in &candidates {
            store.move_stuff(stuff.id, &params.to)?;
            if let Some(audit) = &params.audit {
                record_audit(
                    store,
                    audit,
                    &stuff.location,
                    &params.to,
                    TradeItem::Stuff(stuff.stuff_type.clone()),
                    Decimal::ONE,
                )?;
            }
            moved.push(store.stuff(stuff.id)?);
        }
        tracing::debug!(
            stuff_type = %params.stuff_type,
            count = moved.len(),
            to = %params.to,
            "Stuffs transferred"
        );
        Ok(moved)
    })
}

fn record_audit(
    store: &mut dyn Store,
    audit: &Audit,
    origin: &StorageLocation,
    destination: &StorageLocation,
    item: TradeItem,
    quantity: Decimal,
) -> Result<(), ActionError> {
    let (Some(from_character), Some(to_character)) = (origin.carrier(), destination.carrier())
    else {
        return Ok(());
    };
    if from_character == to_character {
        return Ok(());
    }
    store.record_ledger(TransferParams {
        entry_type: audit.entry_type,
        item,
        quantity,
        from_character,
        to_character,
        reason: audit.reason.clone(),
        reference_id: audit.reference_id,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolling_core::GameConfig;
    use rolling_store::{MemoryAffinities, MemoryStore};
    use rolling_types::{CharacterId, GroundPoint};
    use rust_decimal_macros::dec;

    const HERE: GroundPoint = GroundPoint::new(0, 0, 2, 3);

    fn context() -> EconomyContext {
        let yaml = r"
resources:
  WOOD: { name: Bois, unit: gram }
  FRESH_WATER: { name: Eau potable, unit: litre, drop_to_nowhere: true }
stuffs:
  STONE_HAXE: { name: Hache de pierre }
";
        let config = GameConfig::parse(yaml).unwrap_or_default();
        EconomyContext::new(config, MemoryAffinities::new())
    }

    fn wood() -> ResourceId {
        ResourceId::from("WOOD")
    }

    fn axe(location: StorageLocation) -> Stuff {
        Stuff {
            id: StuffId::new(),
            stuff_type: StuffType::from("STONE_HAXE"),
            location,
            filled_with_resource: None,
            filled_value: None,
            equipped: None,
        }
    }

    #[test]
    fn ground_is_drawn_before_inventory() {
        let context = context();
        let actor = CharacterId::new();
        let ground = StorageLocation::Ground(HERE);
        let bag = StorageLocation::Inventory(actor);
        let mut store = MemoryStore::new();
        assert!(store.add_resource(&ground, &wood(), dec!(0.1)).is_ok());
        assert!(store.add_resource(&bag, &wood(), dec!(0.1)).is_ok());

        let reductions =
            reduce_across_locations(&mut store, &context, &[ground, bag], &wood(), dec!(0.15));

        assert!(reductions.is_ok());
        if let Some(reductions) = reductions.ok() {
            assert_eq!(reductions.len(), 2);
            assert_eq!(reductions.first().map(|r| r.quantity), Some(dec!(0.1)));
            assert_eq!(reductions.get(1).map(|r| r.quantity), Some(dec!(0.05)));
        }
        assert_eq!(store.resource_quantity(&ground, &wood()), Decimal::ZERO);
        assert_eq!(store.resource_quantity(&bag, &wood()), dec!(0.05));
    }

    #[test]
    fn shortfall_reduces_nothing() {
        let context = context();
        let ground = StorageLocation::Ground(HERE);
        let bag = StorageLocation::Inventory(CharacterId::new());
        let mut store = MemoryStore::new();
        assert!(store.add_resource(&ground, &wood(), dec!(0.1)).is_ok());
        assert!(store.add_resource(&bag, &wood(), dec!(0.1)).is_ok());

        let result =
            reduce_across_locations(&mut store, &context, &[ground, bag], &wood(), dec!(0.25));

        assert!(matches!(
            result,
            Err(ActionError::NotEnoughResource { required, available, .. })
                if required == dec!(0.25) && available == dec!(0.2)
        ));
        assert_eq!(store.resource_quantity(&ground, &wood()), dec!(0.1));
        assert_eq!(store.resource_quantity(&bag, &wood()), dec!(0.1));
        assert_eq!(store.open_savepoints(), 0);
    }

    #[test]
    fn empty_locations_are_not_recorded() {
        let context = context();
        let ground = StorageLocation::Ground(HERE);
        let bag = StorageLocation::Inventory(CharacterId::new());
        let mut store = MemoryStore::new();
        assert!(store.add_resource(&bag, &wood(), dec!(1)).is_ok());

        let reductions =
            reduce_across_locations(&mut store, &context, &[ground, bag], &wood(), dec!(0.5));

        assert_eq!(
            reductions.ok(),
            Some(vec![ResourceReduction {
                origin: bag,
                resource_id: wood(),
                quantity: dec!(0.5),
            }])
        );
    }

    #[test]
    fn give_is_audited_drop_is_not() {
        let context = context();
        let alice = CharacterId::new();
        let bob = CharacterId::new();
        let mut store = MemoryStore::new();
        assert!(
            store
                .add_resource(&StorageLocation::Inventory(alice), &wood(), dec!(3))
                .is_ok()
        );
        let audit = Some(Audit::new(LedgerEntryType::Give, "GIVE"));

        let give = ResourceMove {
            from: vec![StorageLocation::Inventory(alice)],
            to: StorageLocation::Inventory(bob),
            resource_id: wood(),
            quantity: dec!(1),
            audit: audit.clone(),
        };
        assert!(transfer_resource(&mut store, &context, &give).is_ok());

        let drop = ResourceMove {
            to: StorageLocation::Ground(HERE),
            ..give
        };
        assert!(transfer_resource(&mut store, &context, &drop).is_ok());

        assert_eq!(store.ledger().len(), 1);
        assert_eq!(
            store.ledger().net_received(bob, &TradeItem::Resource(wood())),
            dec!(1)
        );
        assert_eq!(
            store.resource_quantity(&StorageLocation::Ground(HERE), &wood()),
            dec!(1)
        );
    }

    #[test]
    fn liquids_vanish_on_the_ground() {
        let context = context();
        let water = ResourceId::from("FRESH_WATER");
        let bag = StorageLocation::Inventory(CharacterId::new());
        let mut store = MemoryStore::new();
        assert!(store.add_resource(&bag, &water, dec!(2)).is_ok());

        let drop = ResourceMove {
            from: vec![bag],
            to: StorageLocation::Ground(HERE),
            resource_id: water.clone(),
            quantity: dec!(2),
            audit: None,
        };
        assert!(transfer_resource(&mut store, &context, &drop).is_ok());

        assert_eq!(store.resource_quantity(&bag, &water), Decimal::ZERO);
        assert!(store.resources_at(&StorageLocation::Ground(HERE)).is_empty());
    }

    #[test]
    fn preferred_stuff_moves_first() {
        let context = context();
        let alice = CharacterId::new();
        let bag = StorageLocation::Inventory(alice);
        let first = axe(bag);
        let second = axe(bag);
        let mut store = MemoryStore::new();
        store.insert_stuff(first.clone());
        store.insert_stuff(second.clone());

        let params = StuffMove {
            from: vec![bag],
            to: StorageLocation::Ground(HERE),
            stuff_type: StuffType::from("STONE_HAXE"),
            count: 1,
            preferred: Some(second.id),
            audit: None,
        };
        let moved = transfer_stuffs(&mut store, &context, &params);

        let moved_ids: Option<Vec<StuffId>> =
            moved.ok().map(|m| m.into_iter().map(|s| s.id).collect());
        assert_eq!(moved_ids, Some(vec![second.id]));
        assert_eq!(store.stuff(first.id).ok().map(|s| s.location), Some(bag));
    }

    #[test]
    fn too_few_stuffs_moves_nothing() {
        let context = context();
        let bag = StorageLocation::Inventory(CharacterId::new());
        let only = axe(bag);
        let mut store = MemoryStore::new();
        store.insert_stuff(only.clone());

        let params = StuffMove {
            from: vec![bag],
            to: StorageLocation::Inventory(CharacterId::new()),
            stuff_type: StuffType::from("STONE_HAXE"),
            count: 2,
            preferred: None,
            audit: Some(Audit::new(LedgerEntryType::Give, "GIVE")),
        };
        let result = transfer_stuffs(&mut store, &context, &params);

        assert!(matches!(
            result,
            Err(ActionError::NotEnoughStuff {
                required: 2,
                available: 1,
                ..
            })
        ));
        assert_eq!(store.stuff(only.id).ok().map(|s| s.location), Some(bag));
        assert!(store.ledger().is_empty());
    }

    #[test]
    fn zero_count_is_wrong_input() {
        let context = context();
        let mut store = MemoryStore::new();
        let params = StuffMove {
            from: Vec::new(),
            to: StorageLocation::Ground(HERE),
            stuff_type: StuffType::from("STONE_HAXE"),
            count: 0,
            preferred: None,
            audit: None,
        };
        assert!(matches!(
            transfer_stuffs(&mut store, &context, &params),
            Err(ActionError::WrongInput { .. })
        ));
    }
}
