//! World seeding from JSON.
//!
//! A seed lists the characters, builds, holdings, offers, affinities and
//! claims a process starts with. [`WorldSeed::into_world`] turns it into a
//! [`MemoryStore`] and a [`MemoryAffinities`] directory.

use std::path::Path;

use rolling_store::{Claim, MemoryAffinities, MemoryStore, Store, StoreError};
use rolling_types::{
    AffinityId, Build, Character, CharacterId, Offer, ResourceHolding, Stuff,
};
use serde::Deserialize;

/// Errors that can occur when loading a world seed.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// Failed to read the seed file from disk.
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse JSON content.
    #[error("failed to parse seed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A holding could not be stored.
    #[error("failed to store seeded holding: {0}")]
    Store(#[from] StoreError),
}

/// Initial world content.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorldSeed {
    /// Characters.
    #[serde(default)]
    pub characters: Vec<Character>,
    /// Builds.
    #[serde(default)]
    pub builds: Vec<Build>,
    /// Resource holdings.
    #[serde(default)]
    pub resources: Vec<ResourceHolding>,
    /// Stuffs.
    #[serde(default)]
    pub stuffs: Vec<Stuff>,
    /// Business offers.
    #[serde(default)]
    pub offers: Vec<Offer>,
    /// Affinities and their accepted members.
    #[serde(default)]
    pub affinities: Vec<AffinitySeed>,
    /// Protectorate claims.
    #[serde(default)]
    pub claims: Vec<ClaimSeed>,
}

/// An affinity with its accepted members.
#[derive(Debug, Clone, Deserialize)]
pub struct AffinitySeed {
    /// Affinity identifier.
    pub id: AffinityId,
    /// Display name.
    pub name: String,
    /// Accepted members.
    #[serde(default)]
    pub members: Vec<CharacterId>,
}

/// A claim over one world cell.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimSeed {
    /// Row of the claimed world cell.
    pub world_row: i32,
    /// Column of the claimed world cell.
    pub world_col: i32,
    /// Claim rules.
    #[serde(flatten)]
    pub claim: Claim,
}

impl WorldSeed {
    /// Load a seed from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::Io`] or [`SeedError::Json`].
    pub fn from_file(path: &Path) -> Result<Self, SeedError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a seed from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::Json`] if the content is not a valid seed.
    pub fn parse(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the store and the affinity directory.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::Store`] if a holding has a negative quantity.
    pub fn into_world(self) -> Result<(MemoryStore, MemoryAffinities), SeedError> {
        let mut store = MemoryStore::new();
        let mut affinities = MemoryAffinities::new();

        let counts = (
            self.characters.len(),
            self.resources.len(),
            self.stuffs.len(),
            self.offers.len(),
        );

        for character in self.characters {
            store.insert_character(character);
        }
        for build in self.builds {
            store.insert_build(build);
        }
        for holding in self.resources {
            store.add_resource(&holding.location, &holding.resource_id, holding.quantity)?;
        }
        for stuff in self.stuffs {
            store.insert_stuff(stuff);
        }
        for offer in self.offers {
            store.insert_offer(offer);
        }
        for affinity in self.affinities {
            affinities.add_affinity(affinity.id, affinity.name);
            for member in affinity.members {
                affinities.accept_member(affinity.id, member);
            }
        }
        for seed in self.claims {
            affinities.claim(seed.world_row, seed.world_col, seed.claim);
        }

        tracing::info!(
            characters = counts.0,
            resources = counts.1,
            stuffs = counts.2,
            offers = counts.3,
            "World seeded"
        );
        Ok((store, affinities))
    }
}
