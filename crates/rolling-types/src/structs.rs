//! Core entity structs for the Rolling economy core.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::enums::{EquipSlot, LedgerEntryType, OfferItemPosition, OfferOperand, OfferStatus};
use crate::ids::{
    AffinityId, BuildId, CharacterId, LedgerEntryId, OfferId, OfferItemId, ResourceId, StuffId,
    StuffType,
};

// ---------------------------------------------------------------------------
// Positions and storage locations
// ---------------------------------------------------------------------------

/// A tile of the map: a world cell plus a zone cell inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GroundPoint {
    /// Row of the world cell.
    pub world_row: i32,
    /// Column of the world cell.
    pub world_col: i32,
    /// Row of the tile inside the zone.
    pub zone_row: i32,
    /// Column of the tile inside the zone.
    pub zone_col: i32,
}

impl GroundPoint {
    /// Build a point from world and zone coordinates.
    pub const fn new(world_row: i32, world_col: i32, zone_row: i32, zone_col: i32) -> Self {
        Self {
            world_row,
            world_col,
            zone_row,
            zone_col,
        }
    }
}

impl core::fmt::Display for GroundPoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}.{}/{}.{}",
            self.world_row, self.world_col, self.zone_row, self.zone_col
        )
    }
}

/// Where a resource row or a stuff currently lives.
///
/// A row is always at exactly one location. `SharedPool` rows are carried
/// by `owner` but usable by accepted members of `affinity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "at", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StorageLocation {
    /// Carried by a character, exclusively theirs.
    Inventory(CharacterId),
    /// Lying on a map tile.
    Ground(GroundPoint),
    /// Stored inside a building.
    Build(BuildId),
    /// Carried by `owner` and shared with an affinity.
    SharedPool {
        /// Affinity the row is shared with.
        affinity: AffinityId,
        /// Character carrying the row.
        owner: CharacterId,
    },
}

impl StorageLocation {
    /// The character physically carrying this location, if any.
    pub const fn carrier(&self) -> Option<CharacterId> {
        match self {
            Self::Inventory(character) | Self::SharedPool { owner: character, .. } => {
                Some(*character)
            }
            Self::Ground(_) | Self::Build(_) => None,
        }
    }
}

impl core::fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Inventory(character) => write!(f, "inventory of {character}"),
            Self::Ground(point) => write!(f, "ground at {point}"),
            Self::Build(build) => write!(f, "build {build}"),
            Self::SharedPool { affinity, owner } => {
                write!(f, "pool of {owner} shared with {affinity}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Characters and builds
// ---------------------------------------------------------------------------

/// A playable character, as far as the economy core is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Character {
    /// Unique character identifier.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
    /// Remaining action points for the current turn.
    #[ts(as = "String")]
    pub action_points: Decimal,
    /// Whether others may take from this character by force.
    #[serde(default)]
    pub vulnerable: bool,
    /// Dead characters can neither act nor be acted upon.
    #[serde(default = "default_alive")]
    pub alive: bool,
    /// Tile the character stands on.
    pub position: GroundPoint,
}

const fn default_alive() -> bool {
    true
}

/// A building placed on a tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Build {
    /// Unique build identifier.
    pub id: BuildId,
    /// Configuration key of the build kind.
    pub build_type: String,
    /// Tile the build stands on.
    pub position: GroundPoint,
    /// Whether the build still waits for required resources.
    #[serde(default)]
    pub under_construction: bool,
}

// ---------------------------------------------------------------------------
// Holdings
// ---------------------------------------------------------------------------

/// A discrete, individually identified object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Stuff {
    /// Unique stuff identifier.
    pub id: StuffId,
    /// Configuration key of the stuff kind.
    pub stuff_type: StuffType,
    /// Current location.
    pub location: StorageLocation,
    /// Resource the stuff is filled with, for containers.
    #[serde(default)]
    pub filled_with_resource: Option<ResourceId>,
    /// Quantity of `filled_with_resource` held, in its base unit.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub filled_value: Option<Decimal>,
    /// Slot the stuff is equipped in, if carried and in use.
    #[serde(default)]
    pub equipped: Option<EquipSlot>,
}

/// A quantity of one resource at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceHolding {
    /// Where the resource lies.
    pub location: StorageLocation,
    /// Which resource.
    pub resource_id: ResourceId,
    /// How much, in the resource's base unit.
    #[ts(as = "String")]
    pub quantity: Decimal,
}

/// One step of a multi-location draw.
///
/// Produced in the order locations were drained and used to narrate where
/// a quantity came from. Never re-read for correctness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceReduction {
    /// Location the quantity was drawn from.
    pub origin: StorageLocation,
    /// Which resource.
    pub resource_id: ResourceId,
    /// Quantity drawn, in the resource's base unit.
    #[ts(as = "String")]
    pub quantity: Decimal,
}

/// Something that can change hands: a resource kind or a stuff kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TradeItem {
    /// A quantity of a resource.
    Resource(ResourceId),
    /// A number of stuffs of one kind.
    Stuff(StuffType),
}

impl core::fmt::Display for TradeItem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Resource(id) => write!(f, "resource {id}"),
            Self::Stuff(stuff_type) => write!(f, "stuff {stuff_type}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Business offers
// ---------------------------------------------------------------------------

/// A business offer published by a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Offer {
    /// Unique offer identifier.
    pub id: OfferId,
    /// Character publishing the offer.
    pub owner: CharacterId,
    /// Free-text title.
    pub title: String,
    /// How request items combine.
    pub request_operand: OfferOperand,
    /// How offer items combine.
    pub offer_operand: OfferOperand,
    /// Permanent offers stay open after each deal.
    pub permanent: bool,
    /// Counterpart of a one-off transaction.
    #[serde(default)]
    pub with_character: Option<CharacterId>,
    /// Lifecycle state.
    pub status: OfferStatus,
    /// Lines of both sides.
    pub items: Vec<OfferItem>,
}

impl Offer {
    /// Items the owner asks for.
    pub fn request_items(&self) -> impl Iterator<Item = &OfferItem> {
        self.items
            .iter()
            .filter(|item| item.position == OfferItemPosition::Request)
    }

    /// Items the owner gives.
    pub fn offer_items(&self) -> impl Iterator<Item = &OfferItem> {
        self.items
            .iter()
            .filter(|item| item.position == OfferItemPosition::Offer)
    }

    /// Look up an item by id.
    pub fn item(&self, id: OfferItemId) -> Option<&OfferItem> {
        self.items.iter().find(|item| item.id == id)
    }
}

/// One line of an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct OfferItem {
    /// Unique line identifier.
    pub id: OfferItemId,
    /// Side of the offer.
    pub position: OfferItemPosition,
    /// What changes hands.
    pub item: TradeItem,
    /// How much: base-unit quantity for resources, count for stuffs.
    #[ts(as = "String")]
    pub quantity: Decimal,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// An audit record of an item moving between two characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LedgerEntry {
    /// Unique entry identifier.
    pub id: LedgerEntryId,
    /// The category of transfer.
    pub entry_type: LedgerEntryType,
    /// Character the item left.
    pub from_character: CharacterId,
    /// Character the item reached.
    pub to_character: CharacterId,
    /// What moved.
    pub item: TradeItem,
    /// Base-unit quantity for resources, count for stuffs.
    #[ts(as = "String")]
    pub quantity: Decimal,
    /// Short reason code (e.g. `"GIVE"`, `"TAKE_BY_FORCE"`, `"DEAL"`).
    pub reason: String,
    /// Related entity such as an offer ID.
    pub reference_id: Option<Uuid>,
    /// Real-world timestamp.
    pub created_at: DateTime<Utc>,
}
