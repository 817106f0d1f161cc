//! In-process [`Store`] with an undo journal.
//!
//! While at least one savepoint is open, every mutation pushes the state it
//! overwrote onto a journal. Rolling back a savepoint replays the journal
//! backwards down to the position recorded when the savepoint was opened;
//! committing the outermost savepoint discards the journal.
//!
//! Resource rows are kept in creation order. Ground drops always create a
//! new row, so one tile can hold several rows of the same resource; reads
//! merge them.

use std::collections::BTreeMap;

use rolling_ledger::{Ledger, TransferParams};
use rolling_types::{
    Build, BuildId, Character, CharacterId, LedgerEntry, Offer, OfferId, OfferStatus,
    ResourceHolding, ResourceId, StorageLocation, Stuff, StuffId,
};
use rust_decimal::Decimal;

use crate::{Savepoint, Store, StoreError};

/// A state overwritten by a journaled mutation.
#[derive(Debug)]
enum Undo {
    /// A resource row changed; `None` means it did not exist.
    Row {
        row: u64,
        previous: Option<ResourceHolding>,
    },
    /// A stuff changed.
    Stuff { index: usize, previous: Stuff },
    /// A character changed.
    Character(Character),
    /// An offer's status changed.
    OfferStatus { id: OfferId, previous: OfferStatus },
    /// Ledger entries were appended after the first `len`.
    Ledger { len: usize },
}

/// In-memory world state implementing [`Store`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    characters: BTreeMap<CharacterId, Character>,
    builds: BTreeMap<BuildId, Build>,
    rows: BTreeMap<u64, ResourceHolding>,
    next_row: u64,
    stuffs: Vec<Stuff>,
    offers: BTreeMap<OfferId, Offer>,
    ledger: Ledger,
    journal: Vec<Undo>,
    depth: usize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    /// Insert or replace a character.
    pub fn insert_character(&mut self, character: Character) {
        self.characters.insert(character.id, character);
    }

    /// Insert or replace a build.
    pub fn insert_build(&mut self, build: Build) {
        self.builds.insert(build.id, build);
    }

    /// Insert a stuff, replacing any stuff with the same ID.
    pub fn insert_stuff(&mut self, stuff: Stuff) {
        if let Some(existing) = self.stuffs.iter_mut().find(|s| s.id == stuff.id) {
            *existing = stuff;
        } else {
            self.stuffs.push(stuff);
        }
    }

    /// Insert or replace an offer.
    pub fn insert_offer(&mut self, offer: Offer) {
        self.offers.insert(offer.id, offer);
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Every character.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    /// Every resource row, oldest first, without merging.
    pub fn resource_rows(&self) -> impl Iterator<Item = &ResourceHolding> {
        self.rows.values()
    }

    /// Every stuff, oldest first.
    pub fn stuffs(&self) -> &[Stuff] {
        &self.stuffs
    }

    /// The ledger of cross-character transfers.
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Remove and return committed ledger entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SavepointOpen`] while any savepoint is open,
    /// since its entries could still be rolled back.
    pub fn drain_ledger(&mut self) -> Result<Vec<LedgerEntry>, StoreError> {
        if self.depth > 0 {
            return Err(StoreError::SavepointOpen);
        }
        Ok(self.ledger.drain())
    }

    /// Number of savepoints currently open.
    pub const fn open_savepoints(&self) -> usize {
        self.depth
    }

    // -----------------------------------------------------------------------
    // Journal
    // -----------------------------------------------------------------------

    fn journal(&mut self, undo: Undo) {
        if self.depth > 0 {
            self.journal.push(undo);
        }
    }

    fn write_row(&mut self, row: u64, value: Option<ResourceHolding>) {
        let previous = match value {
            Some(holding) => self.rows.insert(row, holding),
            None => self.rows.remove(&row),
        };
        self.journal(Undo::Row { row, previous });
    }

    fn undo(&mut self, undo: Undo) {
        match undo {
            Undo::Row { row, previous } => {
                match previous {
                    Some(holding) => self.rows.insert(row, holding),
                    None => self.rows.remove(&row),
                };
            }
            Undo::Stuff { index, previous } => {
                if let Some(slot) = self.stuffs.get_mut(index) {
                    *slot = previous;
                }
            }
            Undo::Character(previous) => {
                self.characters.insert(previous.id, previous);
            }
            Undo::OfferStatus { id, previous } => {
                if let Some(offer) = self.offers.get_mut(&id) {
                    offer.status = previous;
                }
            }
            Undo::Ledger { len } => self.ledger.truncate(len),
        }
    }

    fn rows_of<'a>(
        &'a self,
        location: &'a StorageLocation,
        resource_id: &'a ResourceId,
    ) -> impl Iterator<Item = (u64, &'a ResourceHolding)> + 'a {
        self.rows
            .iter()
            .filter(move |(_, h)| &h.location == location && &h.resource_id == resource_id)
            .map(|(row, h)| (*row, h))
    }

    fn stuff_index(&self, id: StuffId) -> Result<usize, StoreError> {
        self.stuffs
            .iter()
            .position(|s| s.id == id)
            .ok_or(StoreError::StuffNotFound(id))
    }

    fn close(&mut self, savepoint: &Savepoint) -> Result<(), StoreError> {
        if self.depth == 0 {
            return Err(StoreError::NoOpenSavepoint);
        }
        if savepoint.depth() != self.depth {
            return Err(StoreError::SavepointOutOfOrder {
                expected: self.depth,
                actual: savepoint.depth(),
            });
        }
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }
}

impl Store for MemoryStore {
    fn character(&self, id: CharacterId) -> Result<Character, StoreError> {
        self.characters
            .get(&id)
            .cloned()
            .ok_or(StoreError::CharacterNotFound(id))
    }

    fn set_action_points(
        &mut self,
        id: CharacterId,
        action_points: Decimal,
    ) -> Result<(), StoreError> {
        let character = self
            .characters
            .get_mut(&id)
            .ok_or(StoreError::CharacterNotFound(id))?;
        let previous = character.clone();
        character.action_points = action_points;
        self.journal(Undo::Character(previous));
        Ok(())
    }

    fn build(&self, id: BuildId) -> Result<Build, StoreError> {
        self.builds
            .get(&id)
            .cloned()
            .ok_or(StoreError::BuildNotFound(id))
    }

    fn resource_quantity(&self, location: &StorageLocation, resource_id: &ResourceId) -> Decimal {
        self.rows_of(location, resource_id)
            .fold(Decimal::ZERO, |total, (_, h)| total.saturating_add(h.quantity))
    }

    fn resources_at(&self, location: &StorageLocation) -> Vec<ResourceHolding> {
        let mut merged: Vec<ResourceHolding> = Vec::new();
        for holding in self.rows.values().filter(|h| &h.location == location) {
            match merged
                .iter_mut()
                .find(|m| m.resource_id == holding.resource_id)
            {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(holding.quantity);
                }
                None => merged.push(holding.clone()),
            }
        }
        merged
    }

    fn add_resource(
        &mut self,
        location: &StorageLocation,
        resource_id: &ResourceId,
        quantity: Decimal,
    ) -> Result<(), StoreError> {
        if quantity.is_sign_negative() {
            return Err(StoreError::NegativeQuantity { quantity });
        }
        if quantity.is_zero() {
            return Ok(());
        }

        let existing = match location {
            StorageLocation::Ground(_) => None,
            _ => self
                .rows_of(location, resource_id)
                .next()
                .map(|(row, h)| (row, h.clone())),
        };

        match existing {
            Some((row, mut holding)) => {
                holding.quantity = holding.quantity.checked_add(quantity).ok_or_else(|| {
                    StoreError::ArithmeticOverflow {
                        context: format!("adding {quantity} of {resource_id} at {location}"),
                    }
                })?;
                self.write_row(row, Some(holding));
            }
            None => {
                let row = self.next_row;
                self.next_row = self.next_row.saturating_add(1);
                self.write_row(
                    row,
                    Some(ResourceHolding {
                        location: *location,
                        resource_id: resource_id.clone(),
                        quantity,
                    }),
                );
            }
        }

        tracing::debug!(%location, %resource_id, %quantity, "Resource added");
        Ok(())
    }

    fn reduce_resource(
        &mut self,
        location: &StorageLocation,
        resource_id: &ResourceId,
        quantity: Decimal,
    ) -> Result<Decimal, StoreError> {
        if quantity.is_sign_negative() {
            return Err(StoreError::NegativeQuantity { quantity });
        }

        let rows: Vec<(u64, ResourceHolding)> = self
            .rows_of(location, resource_id)
            .map(|(row, h)| (row, h.clone()))
            .collect();

        let mut remaining = quantity;
        for (row, mut holding) in rows {
            if remaining.is_zero() {
                break;
            }
            let taken = remaining.min(holding.quantity);
            remaining = remaining.saturating_sub(taken);
            holding.quantity = holding.quantity.saturating_sub(taken);
            if holding.quantity.is_zero() {
                self.write_row(row, None);
            } else {
                self.write_row(row, Some(holding));
            }
        }

        let reduced = quantity.saturating_sub(remaining);
        tracing::debug!(%location, %resource_id, %reduced, "Resource reduced");
        Ok(reduced)
    }

    fn stuff(&self, id: StuffId) -> Result<Stuff, StoreError> {
        self.stuffs
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(StoreError::StuffNotFound(id))
    }

    fn stuffs_at(&self, location: &StorageLocation) -> Vec<Stuff> {
        self.stuffs
            .iter()
            .filter(|s| &s.location == location)
            .cloned()
            .collect()
    }

    fn move_stuff(&mut self, id: StuffId, to: &StorageLocation) -> Result<(), StoreError> {
        let index = self.stuff_index(id)?;
        let stuff = self
            .stuffs
            .get_mut(index)
            .ok_or(StoreError::StuffNotFound(id))?;
        let previous = stuff.clone();
        stuff.location = *to;
        stuff.equipped = None;
        self.journal(Undo::Stuff { index, previous });
        tracing::debug!(stuff_id = %id, location = %to, "Stuff moved");
        Ok(())
    }

    fn set_stuff_filling(
        &mut self,
        id: StuffId,
        resource_id: Option<ResourceId>,
        value: Option<Decimal>,
    ) -> Result<(), StoreError> {
        let index = self.stuff_index(id)?;
        let stuff = self
            .stuffs
            .get_mut(index)
            .ok_or(StoreError::StuffNotFound(id))?;
        let previous = stuff.clone();
        stuff.filled_with_resource = resource_id;
        stuff.filled_value = value;
        self.journal(Undo::Stuff { index, previous });
        Ok(())
    }

    fn offer(&self, id: OfferId) -> Result<Offer, StoreError> {
        self.offers
            .get(&id)
            .cloned()
            .ok_or(StoreError::OfferNotFound(id))
    }

    fn set_offer_status(&mut self, id: OfferId, status: OfferStatus) -> Result<(), StoreError> {
        let offer = self
            .offers
            .get_mut(&id)
            .ok_or(StoreError::OfferNotFound(id))?;
        let previous = offer.status;
        offer.status = status;
        self.journal(Undo::OfferStatus { id, previous });
        Ok(())
    }

    fn record_ledger(&mut self, params: TransferParams) -> Result<(), StoreError> {
        let len = self.ledger.len();
        self.ledger.record_transfer(params)?;
        self.journal(Undo::Ledger { len });
        Ok(())
    }

    fn begin(&mut self) -> Savepoint {
        self.depth = self.depth.saturating_add(1);
        Savepoint::new(self.depth, self.journal.len())
    }

    fn commit(&mut self, savepoint: Savepoint) -> Result<(), StoreError> {
        self.close(&savepoint)?;
        if self.depth == 0 {
            self.journal.clear();
        }
        Ok(())
    }

    fn rollback(&mut self, savepoint: Savepoint) -> Result<(), StoreError> {
        self.close(&savepoint)?;
        let undone = self.journal.len().saturating_sub(savepoint.mark());
        while self.journal.len() > savepoint.mark() {
            if let Some(undo) = self.journal.pop() {
                self.undo(undo);
            }
        }
        tracing::debug!(depth = savepoint.depth(), undone, "Savepoint rolled back");
        Ok(())
    }
}
