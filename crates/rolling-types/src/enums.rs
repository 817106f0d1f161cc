//! Enumeration types for the Rolling economy core.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Canonical storage unit of a resource kind.
///
/// Quantities are always stored and computed in this unit. Display may
/// promote grams to kilograms, but nothing else converts between units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Unit {
    /// Mass, stored in grams.
    Gram,
    /// Volume, stored in litres.
    Litre,
    /// Volume, stored in cubic metres.
    CubicMetre,
    /// Whole items, stored as a count.
    Count,
}

impl Unit {
    /// Whether quantities in this unit must be whole numbers.
    pub const fn is_discrete(self) -> bool {
        matches!(self, Self::Count)
    }

    /// Suffix used when displaying a quantity in the base unit.
    pub const fn base_suffix(self) -> &'static str {
        match self {
            Self::Gram => "g",
            Self::Litre => "l",
            Self::CubicMetre => "m3",
            Self::Count => "u",
        }
    }
}

// ---------------------------------------------------------------------------
// Equipment
// ---------------------------------------------------------------------------

/// Slot a carried stuff can be equipped in.
///
/// A stuff holds at most one slot at a time, which makes the weapon,
/// shield, armor and bag flags mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EquipSlot {
    /// Held as a weapon.
    Weapon,
    /// Held as a shield.
    Shield,
    /// Worn as armor.
    Armor,
    /// Used as a bag to extend carrying capacity.
    Bag,
}

// ---------------------------------------------------------------------------
// Business offers
// ---------------------------------------------------------------------------

/// How the items of one side of an offer combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum OfferOperand {
    /// Every item of the side is required.
    And,
    /// Any single item of the side, chosen before the deal is made.
    Or,
}

/// Which side of an offer an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum OfferItemPosition {
    /// What the owner asks for; moves from the dealing character to the owner.
    Request,
    /// What the owner gives; moves from the owner to the dealing character.
    Offer,
}

/// Lifecycle state of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum OfferStatus {
    /// Being edited by its owner, not visible to others.
    Draft,
    /// Open for dealing.
    Open,
    /// Closed by its owner.
    Closed,
    /// One-off offer that has been dealt.
    Accepted,
    /// One-off offer that has been refused.
    Refused,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Every transfer-based action a character can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ActionType {
    /// Hand stuffs or resources to another character.
    GiveToCharacter,
    /// Take stuffs or resources from another character.
    TakeFromCharacter,
    /// Store stuffs or resources inside a build.
    DepositOnBuild,
    /// Take stuffs or resources stored inside a build.
    TakeFromBuild,
    /// Put carried stuffs or resources on the ground.
    DropOnGround,
    /// Pick up stuffs or resources lying on the ground.
    PickUpFromGround,
    /// Fill a carried container with a resource.
    FillStuff,
    /// Bring a required resource to a build under construction.
    BringResourceOnBuild,
    /// Accept a business offer.
    MakeDeal,
}

impl ActionType {
    /// Every action type, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::GiveToCharacter,
        Self::TakeFromCharacter,
        Self::DepositOnBuild,
        Self::TakeFromBuild,
        Self::DropOnGround,
        Self::PickUpFromGround,
        Self::FillStuff,
        Self::BringResourceOnBuild,
        Self::MakeDeal,
    ];
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Category of a cross-character ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LedgerEntryType {
    /// The giver handed the item over willingly.
    Give,
    /// The receiver took the item (shared pool or by force).
    Take,
    /// The item changed hands as part of a business deal.
    Deal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_count_is_discrete() {
        assert!(Unit::Count.is_discrete());
        assert!(!Unit::Gram.is_discrete());
        assert!(!Unit::Litre.is_discrete());
        assert!(!Unit::CubicMetre.is_discrete());
    }

    #[test]
    fn action_types_use_snake_case_on_the_wire() {
        let json = serde_json::to_string(&ActionType::BringResourceOnBuild).ok();
        assert_eq!(json.as_deref(), Some("\"bring_resource_on_build\""));
    }
}
