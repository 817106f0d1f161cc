//! Location store for the Rolling economy core.
//!
//! Every resource row and every stuff lives at exactly one
//! [`StorageLocation`]. The [`Store`] trait is the row-level contract the
//! transfer engine is written against: read, add, reduce, move, plus
//! nested savepoints where a rollback undoes exactly the mutations made
//! since the matching [`Store::begin`].
//!
//! # Modules
//!
//! - [`memory`] -- [`MemoryStore`], an in-process store with an undo journal
//! - [`affinity`] -- Affinity membership and protectorate claims
//! - [`error`] -- [`StoreError`]
//!
//! # Savepoints
//!
//! ```
//! use rolling_store::{MemoryStore, Store};
//! use rolling_types::{CharacterId, ResourceId, StorageLocation};
//! use rust_decimal::Decimal;
//!
//! let mut store = MemoryStore::new();
//! let bag = StorageLocation::Inventory(CharacterId::new());
//! let wood = ResourceId::from("WOOD");
//! assert!(store.add_resource(&bag, &wood, Decimal::ONE).is_ok());
//!
//! let savepoint = store.begin();
//! assert!(store.reduce_resource(&bag, &wood, Decimal::ONE).is_ok());
//! assert!(store.rollback(savepoint).is_ok());
//!
//! assert_eq!(store.resource_quantity(&bag, &wood), Decimal::ONE);
//! ```
//!
//! [`StorageLocation`]: rolling_types::StorageLocation

pub mod affinity;
pub mod error;
pub mod memory;

pub use affinity::{AffinityDirectory, Claim, MemoryAffinities, Protectorate};
pub use error::StoreError;
pub use memory::MemoryStore;

use rolling_ledger::TransferParams;
use rolling_types::{
    Build, BuildId, Character, CharacterId, Offer, OfferId, OfferStatus, ResourceHolding,
    ResourceId, StorageLocation, Stuff, StuffId,
};
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Savepoints
// ---------------------------------------------------------------------------

/// Handle on an open savepoint.
///
/// Returned by [`Store::begin`] and consumed by exactly one of
/// [`Store::commit`] or [`Store::rollback`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a savepoint must be committed or rolled back"]
pub struct Savepoint {
    depth: usize,
    mark: usize,
}

impl Savepoint {
    /// Create a handle for a savepoint opened at nesting `depth` (1 for the
    /// outermost) whose mutations start at journal position `mark`.
    pub const fn new(depth: usize, mark: usize) -> Self {
        Self { depth, mark }
    }

    /// Nesting depth, 1 for the outermost savepoint.
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Journal position at which the savepoint was opened.
    pub const fn mark(&self) -> usize {
        self.mark
    }
}

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

/// Row-level access to characters, builds, holdings and offers.
///
/// Reads always reflect every mutation made so far, including those inside
/// open savepoints. Implementations never cache across calls.
pub trait Store {
    /// Fetch a character.
    fn character(&self, id: CharacterId) -> Result<Character, StoreError>;

    /// Overwrite a character's remaining action points.
    fn set_action_points(&mut self, id: CharacterId, action_points: Decimal)
    -> Result<(), StoreError>;

    /// Fetch a build.
    fn build(&self, id: BuildId) -> Result<Build, StoreError>;

    /// Total quantity of a resource at a location, merging every row.
    fn resource_quantity(&self, location: &StorageLocation, resource_id: &ResourceId) -> Decimal;

    /// Every resource at a location, one merged holding per resource, in
    /// the order the first row of each was created.
    fn resources_at(&self, location: &StorageLocation) -> Vec<ResourceHolding>;

    /// Add a quantity of a resource at a location.
    fn add_resource(
        &mut self,
        location: &StorageLocation,
        resource_id: &ResourceId,
        quantity: Decimal,
    ) -> Result<(), StoreError>;

    /// Reduce a resource at a location by at most `quantity`.
    ///
    /// Returns the amount actually reduced, which is smaller than
    /// `quantity` when the location held less. Rows reaching zero are
    /// removed.
    fn reduce_resource(
        &mut self,
        location: &StorageLocation,
        resource_id: &ResourceId,
        quantity: Decimal,
    ) -> Result<Decimal, StoreError>;

    /// Fetch a stuff.
    fn stuff(&self, id: StuffId) -> Result<Stuff, StoreError>;

    /// Every stuff at a location, oldest first.
    fn stuffs_at(&self, location: &StorageLocation) -> Vec<Stuff>;

    /// Move a stuff to another location, un-equipping it.
    fn move_stuff(&mut self, id: StuffId, to: &StorageLocation) -> Result<(), StoreError>;

    /// Set or clear what a container stuff is filled with.
    fn set_stuff_filling(
        &mut self,
        id: StuffId,
        resource_id: Option<ResourceId>,
        value: Option<Decimal>,
    ) -> Result<(), StoreError>;

    /// Fetch an offer.
    fn offer(&self, id: OfferId) -> Result<Offer, StoreError>;

    /// Change an offer's lifecycle state.
    fn set_offer_status(&mut self, id: OfferId, status: OfferStatus) -> Result<(), StoreError>;

    /// Append a ledger entry. Discarded if an enclosing savepoint rolls back.
    fn record_ledger(&mut self, params: TransferParams) -> Result<(), StoreError>;

    /// Open a (possibly nested) savepoint.
    fn begin(&mut self) -> Savepoint;

    /// Keep the mutations made since `savepoint` was opened.
    ///
    /// They remain subject to the rollback of an enclosing savepoint.
    fn commit(&mut self, savepoint: Savepoint) -> Result<(), StoreError>;

    /// Undo exactly the mutations made since `savepoint` was opened.
    fn rollback(&mut self, savepoint: Savepoint) -> Result<(), StoreError>;
}

/// Run `op` inside a savepoint: commit on `Ok`, roll back on `Err`.
///
/// # Errors
///
/// Returns the error of `op`, or a [`StoreError`] if closing the
/// savepoint itself failed.
pub fn atomically<T, E>(
    store: &mut dyn Store,
    op: impl FnOnce(&mut dyn Store) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<StoreError>,
{
    let savepoint = store.begin();
    match op(&mut *store) {
        Ok(value) => {
            store.commit(savepoint)?;
            Ok(value)
        }
        Err(err) => {
            tracing::debug!(depth = savepoint.depth(), "Rolling back savepoint");
            store.rollback(savepoint)?;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[derive(Debug)]
    struct Refused;

    #[derive(Debug)]
    enum TestError {
        Refused,
        Store,
    }

    impl From<StoreError> for TestError {
        fn from(_: StoreError) -> Self {
            Self::Store
        }
    }

    impl From<Refused> for TestError {
        fn from(_: Refused) -> Self {
            Self::Refused
        }
    }

    #[test]
    fn atomically_commits_on_success() {
        let mut store = MemoryStore::new();
        let bag = StorageLocation::Inventory(CharacterId::new());
        let wood = ResourceId::from("WOOD");

        let result: Result<(), TestError> = atomically(&mut store, |s| {
            s.add_resource(&bag, &wood, dec!(2))?;
            Ok(())
        });

        assert!(result.is_ok());
        assert_eq!(store.resource_quantity(&bag, &wood), dec!(2));
    }

    #[test]
    fn atomically_rolls_back_on_error() {
        let mut store = MemoryStore::new();
        let bag = StorageLocation::Inventory(CharacterId::new());
        let wood = ResourceId::from("WOOD");
        assert!(store.add_resource(&bag, &wood, dec!(2)).is_ok());

        let result: Result<(), TestError> = atomically(&mut store, |s| {
            s.reduce_resource(&bag, &wood, dec!(1.5))?;
            Err(Refused.into())
        });

        assert!(matches!(result, Err(TestError::Refused)));
        assert_eq!(store.resource_quantity(&bag, &wood), dec!(2));
    }
}
