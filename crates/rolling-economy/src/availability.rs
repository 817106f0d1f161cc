//! Availability resolution.
//!
//! For one actor and one kind of transfer, the [`Resolver`] decides which
//! storage locations may be drawn from and in which order. Locations the
//! actor may not access are left out of the list entirely, so a claimed
//! tile looks empty rather than forbidden.
//!
//! | Kind | Sources, in order |
//! |------|-------------------|
//! | `TakeFromCharacter` | target's inventory and pools if vulnerable, else pools shared with the actor's affinities |
//! | `TakeFromBuild` | the build, if the protectorate allows using builds |
//! | `PickUp` | the actor's tile, if the protectorate allows it |
//! | `OwnHoldings` | the actor's inventory, then pools the actor shares |
//! | `Deposit` | same as `OwnHoldings`, filtered by the build's deposit rules |
//! | `Use` | the actor's tile if allowed, then the actor's inventory |
//!
//! Mutations never use the cached listing; they re-read the store through
//! [`Resolver::resource_sources`] and [`Resolver::stuff_sources`].

use std::cell::OnceCell;

use rolling_store::{Protectorate, Store};
use rolling_types::{
    AffinityId, Build, BuildId, Character, CharacterId, ResourceHolding, ResourceId,
    StorageLocation, Stuff,
};
use rust_decimal::Decimal;

use crate::context::EconomyContext;
use crate::error::ActionError;

/// Which way items flow, relative to the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Draw from another character.
    TakeFromCharacter(CharacterId),
    /// Draw from a build.
    TakeFromBuild(BuildId),
    /// Draw from the ground under the actor.
    PickUp,
    /// Draw from what the actor carries (giving, dropping).
    OwnHoldings,
    /// Draw from what the actor carries, to deposit in a build.
    Deposit(BuildId),
    /// Consume: ground under the actor first, then what the actor carries.
    Use,
}

/// Display name of the ground as a storage.
const GROUND_STORAGE: &str = "Ground storage";

/// What the actor could move, for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Resources merged across every source.
    pub resources: Vec<ResourceHolding>,
    /// Stuffs across every source, in source order.
    pub stuffs: Vec<Stuff>,
}

/// Availability resolver for one request.
///
/// Eligible affinities and the display listing are computed at most once
/// per resolver; build one resolver per request.
#[derive(Debug)]
pub struct Resolver<'a> {
    context: &'a EconomyContext,
    actor: &'a Character,
    kind: TransferKind,
    eligible_affinities: OnceCell<Vec<AffinityId>>,
    listing: OnceCell<Listing>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver for `actor` and `kind`.
    pub const fn new(context: &'a EconomyContext, actor: &'a Character, kind: TransferKind) -> Self {
        Self {
            context,
            actor,
            kind,
            eligible_affinities: OnceCell::new(),
            listing: OnceCell::new(),
        }
    }

    /// The transfer kind this resolver was built for.
    pub const fn kind(&self) -> TransferKind {
        self.kind
    }

    /// Check that the actor may transfer in this direction at all.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Impossible`] when a rule forbids it.
    pub fn check_access(&self, store: &dyn Store) -> Result<(), ActionError> {
        match self.kind {
            TransferKind::TakeFromCharacter(target_id) => {
                let target = co_located_character(store, self.actor, target_id)?;
                if target.vulnerable || !self.eligible_affinities(store).is_empty() {
                    Ok(())
                } else {
                    Err(ActionError::impossible(format!(
                        "{} shares nothing with you and can defend themselves",
                        target.name
                    )))
                }
            }
            TransferKind::TakeFromBuild(build_id) => {
                let build = co_located_build(store, self.actor, build_id)?;
                if self.protectorate().allow_use_builds() {
                    Ok(())
                } else {
                    Err(ActionError::impossible(format!(
                        "The protectorate of this place forbids you to use build {}",
                        build.build_type
                    )))
                }
            }
            TransferKind::Deposit(build_id) => {
                let build = co_located_build(store, self.actor, build_id)?;
                let config = self.context.build_config(&build)?;
                if config.allow_deposit {
                    Ok(())
                } else {
                    Err(ActionError::impossible(format!(
                        "Nothing can be deposited in {}",
                        config.name
                    )))
                }
            }
            TransferKind::PickUp | TransferKind::OwnHoldings | TransferKind::Use => Ok(()),
        }
    }

    /// Check that a resource may travel in this direction.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Impossible`] when a limited build refuses it.
    pub fn check_resource_allowed(
        &self,
        store: &dyn Store,
        resource_id: &ResourceId,
    ) -> Result<(), ActionError> {
        if let TransferKind::Deposit(build_id) = self.kind {
            let build = store.build(build_id).map_err(ActionError::from_requested)?;
            let config = self.context.build_config(&build)?;
            if !config.accepts_resource(resource_id) {
                let name = self.context.requested_resource(resource_id)?.name.clone();
                return Err(ActionError::impossible(format!(
                    "{name} cannot be deposited in {}",
                    config.name
                )));
            }
        }
        Ok(())
    }

    /// Check that stuffs may travel in this direction.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Impossible`] when a limited build refuses them.
    pub fn check_stuffs_allowed(&self, store: &dyn Store) -> Result<(), ActionError> {
        if let TransferKind::Deposit(build_id) = self.kind {
            let build = store.build(build_id).map_err(ActionError::from_requested)?;
            let config = self.context.build_config(&build)?;
            if !config.accepts_stuffs() {
                return Err(ActionError::impossible(format!(
                    "Objects cannot be deposited in {}",
                    config.name
                )));
            }
        }
        Ok(())
    }

    /// Label of the ground storage under the actor, naming the affinity
    /// claiming it. `None` unless this kind reads from the ground.
    pub fn ground_label(&self) -> Option<String> {
        if !matches!(self.kind, TransferKind::PickUp | TransferKind::Use) {
            return None;
        }
        let affinities = self.context.affinities();
        let owner = affinities
            .claim_at(&self.actor.position)
            .and_then(|claim| affinities.affinity_name(claim.affinity));
        Some(owner.map_or_else(
            || GROUND_STORAGE.to_owned(),
            |name| format!("{GROUND_STORAGE} ({name})"),
        ))
    }

    /// Ordered resource sources.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Store`] if the target cannot be read.
    pub fn resource_sources(&self, store: &dyn Store) -> Result<Vec<StorageLocation>, ActionError> {
        let ground = StorageLocation::Ground(self.actor.position);
        let inventory = StorageLocation::Inventory(self.actor.id);
        Ok(match self.kind {
            TransferKind::TakeFromCharacter(target_id) => self.target_sources(store, target_id)?,
            TransferKind::TakeFromBuild(build_id) => vec![StorageLocation::Build(build_id)],
            TransferKind::PickUp => {
                if self.protectorate().allow_ground_resources() {
                    vec![ground]
                } else {
                    Vec::new()
                }
            }
            TransferKind::OwnHoldings | TransferKind::Deposit(_) => self.own_sources(),
            TransferKind::Use => {
                if self.protectorate().allow_ground_resources() {
                    vec![ground, inventory]
                } else {
                    vec![inventory]
                }
            }
        })
    }

    /// Ordered stuff sources.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Store`] if the target cannot be read.
    pub fn stuff_sources(&self, store: &dyn Store) -> Result<Vec<StorageLocation>, ActionError> {
        let ground = StorageLocation::Ground(self.actor.position);
        let inventory = StorageLocation::Inventory(self.actor.id);
        Ok(match self.kind {
            TransferKind::TakeFromCharacter(target_id) => self.target_sources(store, target_id)?,
            TransferKind::TakeFromBuild(build_id) => vec![StorageLocation::Build(build_id)],
            TransferKind::PickUp => {
                if self.protectorate().allow_ground_stuffs() {
                    vec![ground]
                } else {
                    Vec::new()
                }
            }
            TransferKind::OwnHoldings | TransferKind::Deposit(_) => self.own_sources(),
            TransferKind::Use => {
                if self.protectorate().allow_ground_stuffs() {
                    vec![ground, inventory]
                } else {
                    vec![inventory]
                }
            }
        })
    }

    /// Total quantity of a resource across the sources, read fresh.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Store`] if the target cannot be read.
    pub fn available_quantity(
        &self,
        store: &dyn Store,
        resource_id: &ResourceId,
    ) -> Result<Decimal, ActionError> {
        Ok(self
            .resource_sources(store)?
            .iter()
            .fold(Decimal::ZERO, |total, location| {
                total.saturating_add(store.resource_quantity(location, resource_id))
            }))
    }

    /// Stuffs of the same kind as `reference` across the sources, read fresh.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Store`] if the target cannot be read.
    pub fn available_stuffs_like(
        &self,
        store: &dyn Store,
        reference: &Stuff,
    ) -> Result<Vec<Stuff>, ActionError> {
        Ok(self
            .stuff_sources(store)?
            .iter()
            .flat_map(|location| store.stuffs_at(location))
            .filter(|s| s.stuff_type == reference.stuff_type)
            .collect())
    }

    /// Everything the actor could move, for display only.
    ///
    /// Computed once per resolver. Deposit listings only show what the
    /// build accepts.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Store`] if the target cannot be read.
    pub fn listing(&self, store: &dyn Store) -> Result<&Listing, ActionError> {
        if let Some(listing) = self.listing.get() {
            return Ok(listing);
        }

        let mut resources: Vec<ResourceHolding> = Vec::new();
        for location in self.resource_sources(store)? {
            for holding in store.resources_at(&location) {
                if self.check_resource_allowed(store, &holding.resource_id).is_err() {
                    continue;
                }
                match resources
                    .iter_mut()
                    .find(|r| r.resource_id == holding.resource_id)
                {
                    Some(existing) => {
                        existing.quantity = existing.quantity.saturating_add(holding.quantity);
                    }
                    None => resources.push(holding),
                }
            }
        }

        let stuffs = if self.check_stuffs_allowed(store).is_ok() {
            self.stuff_sources(store)?
                .iter()
                .flat_map(|location| store.stuffs_at(location))
                .collect()
        } else {
            Vec::new()
        };

        Ok(self.listing.get_or_init(|| Listing { resources, stuffs }))
    }

    /// Affinities through which the actor may draw from the target's pools.
    ///
    /// An affinity is eligible when the actor is an accepted member and the
    /// target shares at least one thing with it. Empty for every kind but
    /// [`TransferKind::TakeFromCharacter`].
    pub fn eligible_affinities(&self, store: &dyn Store) -> &[AffinityId] {
        self.eligible_affinities.get_or_init(|| match self.kind {
            TransferKind::TakeFromCharacter(target_id) => self
                .context
                .affinities()
                .accepted_affinities(self.actor.id)
                .into_iter()
                .filter(|affinity| count_things_shared_with_affinity(store, target_id, *affinity) > 0)
                .collect(),
            _ => Vec::new(),
        })
    }

    fn target_sources(
        &self,
        store: &dyn Store,
        target_id: CharacterId,
    ) -> Result<Vec<StorageLocation>, ActionError> {
        let target = store.character(target_id).map_err(ActionError::from_requested)?;
        if target.vulnerable {
            let mut sources = vec![StorageLocation::Inventory(target_id)];
            sources.extend(
                self.context
                    .affinities()
                    .accepted_affinities(target_id)
                    .into_iter()
                    .map(|affinity| StorageLocation::SharedPool {
                        affinity,
                        owner: target_id,
                    }),
            );
            Ok(sources)
        } else {
            Ok(self
                .eligible_affinities(store)
                .iter()
                .map(|affinity| StorageLocation::SharedPool {
                    affinity: *affinity,
                    owner: target_id,
                })
                .collect())
        }
    }

    fn own_sources(&self) -> Vec<StorageLocation> {
        let mut sources = vec![StorageLocation::Inventory(self.actor.id)];
        sources.extend(
            self.context
                .affinities()
                .accepted_affinities(self.actor.id)
                .into_iter()
                .map(|affinity| StorageLocation::SharedPool {
                    affinity,
                    owner: self.actor.id,
                }),
        );
        sources
    }

    fn protectorate(&self) -> Protectorate {
        Protectorate::at(
            self.context.affinities(),
            &self.actor.position,
            self.actor.id,
        )
    }
}

/// Fetch a living character standing on the actor's tile.
///
/// # Errors
///
/// Returns [`ActionError::Impossible`] for the actor itself, a dead
/// character, or one standing elsewhere.
pub fn co_located_character(
    store: &dyn Store,
    actor: &Character,
    id: CharacterId,
) -> Result<Character, ActionError> {
    let target = store.character(id).map_err(ActionError::from_requested)?;
    if target.id == actor.id {
        return Err(ActionError::impossible("You cannot do this with yourself"));
    }
    if !target.alive {
        return Err(ActionError::impossible(format!("{} is dead", target.name)));
    }
    if target.position != actor.position {
        return Err(ActionError::impossible(format!("{} is not here", target.name)));
    }
    Ok(target)
}

/// Fetch a build standing on the actor's tile.
///
/// # Errors
///
/// Returns [`ActionError::Impossible`] if the build stands elsewhere.
pub fn co_located_build(
    store: &dyn Store,
    actor: &Character,
    id: BuildId,
) -> Result<Build, ActionError> {
    let build = store.build(id).map_err(ActionError::from_requested)?;
    if build.position != actor.position {
        return Err(ActionError::impossible("This build is not here"));
    }
    Ok(build)
}

/// Number of resource kinds and stuffs `owner` shares with `affinity`.
pub fn count_things_shared_with_affinity(
    store: &dyn Store,
    owner: CharacterId,
    affinity: AffinityId,
) -> usize {
    let pool = StorageLocation::SharedPool { affinity, owner };
    store
        .resources_at(&pool)
        .len()
        .saturating_add(store.stuffs_at(&pool).len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolling_core::GameConfig;
    use rolling_store::{Claim, MemoryAffinities, MemoryStore};
    use rolling_types::GroundPoint;
    use rust_decimal_macros::dec;

    const HERE: GroundPoint = GroundPoint::new(0, 0, 1, 1);

    fn character(name: &str, vulnerable: bool) -> Character {
        Character {
            id: CharacterId::new(),
            name: name.to_owned(),
            action_points: dec!(10),
            vulnerable,
            alive: true,
            position: HERE,
        }
    }

    fn wood() -> ResourceId {
        ResourceId::from("WOOD")
    }

    #[test]
    fn stranger_cannot_take_from_defended_character() {
        let actor = character("Alice", false);
        let target = character("Bob", false);
        let mut store = MemoryStore::new();
        store.insert_character(actor.clone());
        store.insert_character(target.clone());
        assert!(
            store
                .add_resource(&StorageLocation::Inventory(target.id), &wood(), dec!(1))
                .is_ok()
        );

        let context = EconomyContext::new(GameConfig::default(), MemoryAffinities::new());
        let resolver = Resolver::new(&context, &actor, TransferKind::TakeFromCharacter(target.id));

        assert!(matches!(
            resolver.check_access(&store),
            Err(ActionError::Impossible { .. })
        ));
        assert_eq!(resolver.resource_sources(&store).ok(), Some(Vec::new()));
    }

    #[test]
    fn vulnerable_target_exposes_inventory_then_pools() {
        let actor = character("Alice", false);
        let target = character("Bob", true);
        let clan = AffinityId::new();
        let mut affinities = MemoryAffinities::new();
        affinities.accept_member(clan, target.id);
        let mut store = MemoryStore::new();
        store.insert_character(target.clone());

        let context = EconomyContext::new(GameConfig::default(), affinities);
        let resolver = Resolver::new(&context, &actor, TransferKind::TakeFromCharacter(target.id));

        assert!(resolver.check_access(&store).is_ok());
        assert_eq!(
            resolver.resource_sources(&store).ok(),
            Some(vec![
                StorageLocation::Inventory(target.id),
                StorageLocation::SharedPool {
                    affinity: clan,
                    owner: target.id
                },
            ])
        );
    }

    #[test]
    fn affinity_member_only_sees_shared_pool() {
        let actor = character("Alice", false);
        let target = character("Bob", false);
        let clan = AffinityId::new();
        let other = AffinityId::new();
        let mut affinities = MemoryAffinities::new();
        for member in [actor.id, target.id] {
            affinities.accept_member(clan, member);
            affinities.accept_member(other, member);
        }
        let mut store = MemoryStore::new();
        store.insert_character(target.clone());
        let pool = StorageLocation::SharedPool {
            affinity: clan,
            owner: target.id,
        };
        assert!(store.add_resource(&pool, &wood(), dec!(1)).is_ok());
        assert!(
            store
                .add_resource(&StorageLocation::Inventory(target.id), &wood(), dec!(5))
                .is_ok()
        );

        let context = EconomyContext::new(GameConfig::default(), affinities);
        let resolver = Resolver::new(&context, &actor, TransferKind::TakeFromCharacter(target.id));

        assert_eq!(resolver.eligible_affinities(&store), [clan]);
        assert_eq!(resolver.resource_sources(&store).ok(), Some(vec![pool]));
        assert_eq!(resolver.available_quantity(&store, &wood()).ok(), Some(dec!(1)));
    }

    #[test]
    fn claimed_ground_is_hidden_from_strangers() {
        let actor = character("Alice", false);
        let mut affinities = MemoryAffinities::new();
        affinities.claim(
            HERE.world_row,
            HERE.world_col,
            Claim {
                affinity: AffinityId::new(),
                open_ground_resources: false,
                open_ground_stuffs: false,
                open_builds: false,
            },
        );
        let mut store = MemoryStore::new();
        assert!(
            store
                .add_resource(&StorageLocation::Ground(HERE), &wood(), dec!(3))
                .is_ok()
        );

        let context = EconomyContext::new(GameConfig::default(), affinities);
        let pick_up = Resolver::new(&context, &actor, TransferKind::PickUp);
        let using = Resolver::new(&context, &actor, TransferKind::Use);

        assert_eq!(pick_up.available_quantity(&store, &wood()).ok(), Some(Decimal::ZERO));
        assert!(pick_up.listing(&store).is_ok_and(|l| l.resources.is_empty()));
        assert_eq!(
            using.resource_sources(&store).ok(),
            Some(vec![StorageLocation::Inventory(actor.id)])
        );
    }

    #[test]
    fn ground_label_names_the_claiming_affinity() {
        let actor = character("Alice", false);
        let clan = AffinityId::new();
        let mut affinities = MemoryAffinities::new();
        affinities.add_affinity(clan, "Clan du lac");
        affinities.claim(
            HERE.world_row,
            HERE.world_col,
            Claim {
                affinity: clan,
                open_ground_resources: true,
                open_ground_stuffs: true,
                open_builds: true,
            },
        );
        let context = EconomyContext::new(GameConfig::default(), affinities);

        let pick_up = Resolver::new(&context, &actor, TransferKind::PickUp);
        let drop = Resolver::new(&context, &actor, TransferKind::OwnHoldings);

        assert_eq!(
            pick_up.ground_label().as_deref(),
            Some("Ground storage (Clan du lac)")
        );
        assert_eq!(drop.ground_label(), None);
    }

    #[test]
    fn unclaimed_ground_has_a_plain_label() {
        let actor = character("Alice", false);
        let context = EconomyContext::new(GameConfig::default(), MemoryAffinities::new());
        let resolver = Resolver::new(&context, &actor, TransferKind::Use);

        assert_eq!(resolver.ground_label().as_deref(), Some("Ground storage"));
    }

    #[test]
    fn use_draws_from_ground_before_inventory() {
        let actor = character("Alice", false);
        let context = EconomyContext::new(GameConfig::default(), MemoryAffinities::new());
        let resolver = Resolver::new(&context, &actor, TransferKind::Use);
        let store = MemoryStore::new();

        assert_eq!(
            resolver.resource_sources(&store).ok(),
            Some(vec![
                StorageLocation::Ground(HERE),
                StorageLocation::Inventory(actor.id)
            ])
        );
    }

    #[test]
    fn limited_build_refuses_other_resources() {
        let yaml = r"
resources:
  WOOD: { name: Bois, unit: gram }
  STONE: { name: Pierre, unit: gram }
builds:
  SHELTER:
    name: Abri
    allow_deposit: true
    allow_deposit_limited: true
    allowed_resource_ids: [WOOD]
";
        let config = GameConfig::parse(yaml);
        assert!(config.is_ok());
        let Some(config) = config.ok() else { return };

        let actor = character("Alice", false);
        let build = Build {
            id: BuildId::new(),
            build_type: "SHELTER".to_owned(),
            position: HERE,
            under_construction: false,
        };
        let mut store = MemoryStore::new();
        store.insert_build(build.clone());
        let bag = StorageLocation::Inventory(actor.id);
        assert!(store.add_resource(&bag, &wood(), dec!(1)).is_ok());
        assert!(store.add_resource(&bag, &ResourceId::from("STONE"), dec!(1)).is_ok());

        let context = EconomyContext::new(config, MemoryAffinities::new());
        let resolver = Resolver::new(&context, &actor, TransferKind::Deposit(build.id));

        assert!(resolver.check_access(&store).is_ok());
        assert!(resolver.check_resource_allowed(&store, &wood()).is_ok());
        assert!(matches!(
            resolver.check_resource_allowed(&store, &ResourceId::from("STONE")),
            Err(ActionError::Impossible { .. })
        ));
        assert!(resolver.check_stuffs_allowed(&store).is_err());
        let listed = resolver.listing(&store).map(|l| l.resources.len()).ok();
        assert_eq!(listed, Some(1));
    }
}
