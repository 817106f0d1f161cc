//! Type-safe identifier wrappers.
//!
//! Entities stored as rows (characters, builds, stuffs, offers, ledger
//! entries) carry a UUID v7 newtype so identifiers cannot be mixed at
//! compile time. Game content that is declared in configuration (resource
//! kinds, stuff kinds) is addressed by a string key instead.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

/// Generates a newtype wrapper around a configuration key [`String`].
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Create a key from anything string-like.
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// Borrow the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(key: &str) -> Self {
                Self(key.to_owned())
            }
        }
    };
}

define_id! {
    /// Unique identifier for a playable character.
    CharacterId
}

define_id! {
    /// Unique identifier for a building placed in a zone.
    BuildId
}

define_id! {
    /// Unique identifier for an affinity (faction, guild, clan).
    AffinityId
}

define_id! {
    /// Unique identifier for an individual stuff row.
    StuffId
}

define_id! {
    /// Unique identifier for a business offer.
    OfferId
}

define_id! {
    /// Unique identifier for one line of a business offer.
    OfferItemId
}

define_id! {
    /// Unique identifier for a ledger entry (cross-character transfer record).
    LedgerEntryId
}

define_key! {
    /// Configuration key of a resource kind (e.g. `WOOD`, `FRESH_WATER`).
    ResourceId
}

define_key! {
    /// Configuration key of a stuff kind (e.g. `STONE_HAXE`, `PLASTIC_BOTTLE_1L`).
    StuffType
}
