//! Affinity membership and protectorate claims.
//!
//! An affinity can claim world cells. On a claimed cell only accepted
//! members may use the ground and the builds, unless the claim opens them
//! to everyone. Unclaimed cells are open to all.

use std::collections::{BTreeMap, BTreeSet};

use rolling_types::{AffinityId, CharacterId, GroundPoint};
use serde::{Deserialize, Serialize};

/// An affinity's claim over one world cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claiming affinity.
    pub affinity: AffinityId,
    /// Non-members may take resources lying on the ground.
    #[serde(default)]
    pub open_ground_resources: bool,
    /// Non-members may take stuffs lying on the ground.
    #[serde(default)]
    pub open_ground_stuffs: bool,
    /// Non-members may take from builds.
    #[serde(default)]
    pub open_builds: bool,
}

/// Read-only view of affinities, their members and their claims.
pub trait AffinityDirectory {
    /// Affinities the character is an accepted member of.
    fn accepted_affinities(&self, character: CharacterId) -> Vec<AffinityId>;

    /// Claim covering the world cell of `point`, if any.
    fn claim_at(&self, point: &GroundPoint) -> Option<Claim>;

    /// Display name of an affinity.
    fn affinity_name(&self, affinity: AffinityId) -> Option<String>;

    /// Whether the character is an accepted member of the affinity.
    fn is_member(&self, character: CharacterId, affinity: AffinityId) -> bool {
        self.accepted_affinities(character).contains(&affinity)
    }
}

/// What one character may do on one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Protectorate {
    claim: Option<Claim>,
    member: bool,
}

impl Protectorate {
    /// Resolve the protectorate of `point` for `actor`.
    pub fn at(directory: &dyn AffinityDirectory, point: &GroundPoint, actor: CharacterId) -> Self {
        let claim = directory.claim_at(point);
        let member = claim.is_some_and(|c| directory.is_member(actor, c.affinity));
        Self { claim, member }
    }

    /// Whether the actor may see and take resources on the ground.
    pub const fn allow_ground_resources(&self) -> bool {
        match self.claim {
            None => true,
            Some(claim) => self.member || claim.open_ground_resources,
        }
    }

    /// Whether the actor may see and take stuffs on the ground.
    pub const fn allow_ground_stuffs(&self) -> bool {
        match self.claim {
            None => true,
            Some(claim) => self.member || claim.open_ground_stuffs,
        }
    }

    /// Whether the actor may take from builds.
    pub const fn allow_use_builds(&self) -> bool {
        match self.claim {
            None => true,
            Some(claim) => self.member || claim.open_builds,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct AffinityRecord {
    name: String,
    members: BTreeSet<CharacterId>,
}

/// In-memory [`AffinityDirectory`].
#[derive(Debug, Clone, Default)]
pub struct MemoryAffinities {
    affinities: BTreeMap<AffinityId, AffinityRecord>,
    claims: BTreeMap<(i32, i32), Claim>,
}

impl MemoryAffinities {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an affinity.
    pub fn add_affinity(&mut self, id: AffinityId, name: impl Into<String>) {
        self.affinities.entry(id).or_default().name = name.into();
    }

    /// Accept a character into an affinity, declaring it if needed.
    pub fn accept_member(&mut self, affinity: AffinityId, character: CharacterId) {
        self.affinities
            .entry(affinity)
            .or_default()
            .members
            .insert(character);
    }

    /// Claim the world cell at `world_row`, `world_col`.
    pub fn claim(&mut self, world_row: i32, world_col: i32, claim: Claim) {
        self.claims.insert((world_row, world_col), claim);
    }
}

impl AffinityDirectory for MemoryAffinities {
    fn accepted_affinities(&self, character: CharacterId) -> Vec<AffinityId> {
        self.affinities
            .iter()
            .filter(|(_, record)| record.members.contains(&character))
            .map(|(id, _)| *id)
            .collect()
    }

    fn claim_at(&self, point: &GroundPoint) -> Option<Claim> {
        self.claims.get(&(point.world_row, point.world_col)).copied()
    }

    fn affinity_name(&self, affinity: AffinityId) -> Option<String> {
        self.affinities.get(&affinity).map(|r| r.name.clone())
    }
}
