//! The ledger: an append-only log of cross-character transfers.
//!
//! # Design
//!
//! - **Append-only** during normal play. The only removals are
//!   [`Ledger::truncate`], used when a savepoint rolls back, and
//!   [`Ledger::drain`], used when committed entries are flushed to storage.
//! - **Precision**: all quantities use [`Decimal`] -- no floating point.

use rust_decimal::Decimal;
use uuid::Uuid;

use rolling_types::{CharacterId, LedgerEntry, LedgerEntryType, TradeItem};

use crate::{LedgerError, TransactionBuilder};

// ---------------------------------------------------------------------------
// Transfer parameters
// ---------------------------------------------------------------------------

/// Parameters for recording one item moving between two characters.
pub struct TransferParams {
    /// The category of transfer.
    pub entry_type: LedgerEntryType,
    /// What moved.
    pub item: TradeItem,
    /// Quantity moved (count for stuffs).
    pub quantity: Decimal,
    /// Character the item left.
    pub from_character: CharacterId,
    /// Character the item reached.
    pub to_character: CharacterId,
    /// Short reason code.
    pub reason: String,
    /// Optional reference to a related entity (e.g. offer ID).
    pub reference_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Log of every item that changed hands between characters.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    /// All entries, in insertion order.
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Create a new empty ledger.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Return the number of entries in the ledger.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return whether the ledger has no entries.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Append a pre-built [`LedgerEntry`].
    pub fn append(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    /// Build, validate and append an entry.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_transfer(&mut self, params: TransferParams) -> Result<&LedgerEntry, LedgerError> {
        let entry = build_entry(params)?;
        self.entries.push(entry);

        self.entries.last().ok_or(LedgerError::InternalError(
            "failed to retrieve entry after append",
        ))
    }

    /// Discard every entry appended after the first `len` entries.
    pub fn truncate(&mut self, len: usize) {
        if len < self.entries.len() {
            tracing::debug!(
                discarded = self.entries.len().saturating_sub(len),
                "Discarding rolled back ledger entries"
            );
        }
        self.entries.truncate(len);
    }

    /// Remove and return every entry, leaving the ledger empty.
    pub fn drain(&mut self) -> Vec<LedgerEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Entries where `character` is the giver or the receiver.
    pub fn entries_for(&self, character: CharacterId) -> impl Iterator<Item = &LedgerEntry> {
        self.entries
            .iter()
            .filter(move |e| e.from_character == character || e.to_character == character)
    }

    /// Net quantity of `item` received by `character` across all entries.
    ///
    /// Negative when the character gave away more than it received.
    pub fn net_received(&self, character: CharacterId, item: &TradeItem) -> Decimal {
        let mut balance = Decimal::ZERO;
        for entry in self.entries.iter().filter(|e| &e.item == item) {
            if entry.to_character == character {
                balance = balance.saturating_add(entry.quantity);
            }
            if entry.from_character == character {
                balance = balance.saturating_sub(entry.quantity);
            }
        }
        balance
    }
}

/// Validate `params` into an entry through the [`TransactionBuilder`].
///
/// # Errors
///
/// Returns [`LedgerError`] if the entry fails validation.
pub fn build_entry(params: TransferParams) -> Result<LedgerEntry, LedgerError> {
    let mut builder = TransactionBuilder::new(params.entry_type, params.item)
        .from(params.from_character)
        .to(params.to_character)
        .quantity(params.quantity)
        .reason(params.reason);

    if let Some(ref_id) = params.reference_id {
        builder = builder.reference_id(ref_id);
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolling_types::{ResourceId, StuffType};
    use rust_decimal_macros::dec;

    fn params(from: CharacterId, to: CharacterId, item: TradeItem, qty: Decimal) -> TransferParams {
        TransferParams {
            entry_type: LedgerEntryType::Give,
            item,
            quantity: qty,
            from_character: from,
            to_character: to,
            reason: "GIVE".to_owned(),
            reference_id: None,
        }
    }

    #[test]
    fn new_ledger_is_empty() {
        let ledger = Ledger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn invalid_entry_is_not_appended() {
        let mut ledger = Ledger::new();
        let who = CharacterId::new();
        let result = ledger.record_transfer(params(
            who,
            who,
            TradeItem::Resource(ResourceId::from("WOOD")),
            Decimal::ONE,
        ));
        assert!(result.is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn truncate_discards_only_later_entries() {
        let mut ledger = Ledger::new();
        let a = CharacterId::new();
        let b = CharacterId::new();
        let wood = TradeItem::Resource(ResourceId::from("WOOD"));

        assert!(ledger.record_transfer(params(a, b, wood.clone(), dec!(1))).is_ok());
        let mark = ledger.len();
        assert!(ledger.record_transfer(params(b, a, wood.clone(), dec!(2))).is_ok());
        assert!(ledger.record_transfer(params(a, b, wood, dec!(3))).is_ok());

        ledger.truncate(mark);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.entries().first().map(|e| e.quantity), Some(dec!(1)));
    }

    #[test]
    fn net_received_balances_both_directions() {
        let mut ledger = Ledger::new();
        let a = CharacterId::new();
        let b = CharacterId::new();
        let wood = TradeItem::Resource(ResourceId::from("WOOD"));
        let axe = TradeItem::Stuff(StuffType::from("STONE_HAXE"));

        assert!(ledger.record_transfer(params(a, b, wood.clone(), dec!(1.5))).is_ok());
        assert!(ledger.record_transfer(params(b, a, wood.clone(), dec!(0.5))).is_ok());
        assert!(ledger.record_transfer(params(a, b, axe.clone(), dec!(1))).is_ok());

        assert_eq!(ledger.net_received(b, &wood), dec!(1.0));
        assert_eq!(ledger.net_received(a, &wood), dec!(-1.0));
        assert_eq!(ledger.net_received(b, &axe), dec!(1));
        assert_eq!(ledger.entries_for(a).count(), 3);
    }

    #[test]
    fn drain_empties_the_ledger() {
        let mut ledger = Ledger::new();
        let wood = TradeItem::Resource(ResourceId::from("WOOD"));
        assert!(
            ledger
                .record_transfer(params(CharacterId::new(), CharacterId::new(), wood, dec!(1)))
                .is_ok()
        );
        let drained = ledger.drain();
        assert_eq!(drained.len(), 1);
        assert!(ledger.is_empty());
    }
}
