//! Transaction builder and validation for ledger entries.
//!
//! A [`TransactionBuilder`] refuses to produce an entry unless it has a
//! giver, a receiver distinct from the giver, a strictly positive quantity
//! and a reason.

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use rolling_types::{CharacterId, LedgerEntry, LedgerEntryId, LedgerEntryType, TradeItem};

use crate::LedgerError;

// ---------------------------------------------------------------------------
// Transaction builder
// ---------------------------------------------------------------------------

/// Builder for constructing validated [`LedgerEntry`] values.
///
/// # Examples
///
/// ```
/// use rolling_ledger::TransactionBuilder;
/// use rolling_types::{CharacterId, LedgerEntryType, StuffType, TradeItem};
/// use rust_decimal::Decimal;
///
/// let entry = TransactionBuilder::new(
///     LedgerEntryType::Take,
///     TradeItem::Stuff(StuffType::from("STONE_HAXE")),
/// )
/// .from(CharacterId::new())
/// .to(CharacterId::new())
/// .quantity(Decimal::ONE)
/// .reason("TAKE_BY_FORCE".to_owned())
/// .build();
///
/// assert!(entry.is_ok());
/// ```
#[derive(Debug)]
pub struct TransactionBuilder {
    entry_type: LedgerEntryType,
    item: TradeItem,
    from_character: Option<CharacterId>,
    to_character: Option<CharacterId>,
    quantity: Option<Decimal>,
    reason: Option<String>,
    reference_id: Option<Uuid>,
}

impl TransactionBuilder {
    /// Start building a ledger entry for the given entry type and item.
    pub const fn new(entry_type: LedgerEntryType, item: TradeItem) -> Self {
        Self {
            entry_type,
            item,
            from_character: None,
            to_character: None,
            quantity: None,
            reason: None,
            reference_id: None,
        }
    }

    /// Set the character the item leaves.
    #[must_use]
    pub const fn from(mut self, character: CharacterId) -> Self {
        self.from_character = Some(character);
        self
    }

    /// Set the character the item reaches.
    #[must_use]
    pub const fn to(mut self, character: CharacterId) -> Self {
        self.to_character = Some(character);
        self
    }

    /// Set the quantity moved.
    #[must_use]
    pub const fn quantity(mut self, qty: Decimal) -> Self {
        self.quantity = Some(qty);
        self
    }

    /// Set the reason code.
    #[must_use]
    pub fn reason(mut self, reason: String) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Link the entry to a related entity (e.g. an offer).
    #[must_use]
    pub const fn reference_id(mut self, id: Uuid) -> Self {
        self.reference_id = Some(id);
        self
    }

    /// Validate inputs and produce a [`LedgerEntry`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingField`] if a required field is not set.
    /// Returns [`LedgerError::ZeroQuantity`] or
    /// [`LedgerError::NegativeQuantity`] for a non-positive quantity.
    /// Returns [`LedgerError::SameCharacter`] if giver and receiver match.
    pub fn build(self) -> Result<LedgerEntry, LedgerError> {
        let from_character = self
            .from_character
            .ok_or(LedgerError::MissingField("from_character"))?;
        let to_character = self
            .to_character
            .ok_or(LedgerError::MissingField("to_character"))?;
        let quantity = self.quantity.ok_or(LedgerError::MissingField("quantity"))?;
        let reason = self.reason.ok_or(LedgerError::MissingField("reason"))?;

        if quantity.is_zero() {
            return Err(LedgerError::ZeroQuantity);
        }
        if quantity.is_sign_negative() {
            return Err(LedgerError::NegativeQuantity { quantity });
        }
        if from_character == to_character {
            return Err(LedgerError::SameCharacter(from_character));
        }

        Ok(LedgerEntry {
            id: LedgerEntryId::new(),
            entry_type: self.entry_type,
            from_character,
            to_character,
            item: self.item,
            quantity,
            reason,
            reference_id: self.reference_id,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolling_types::ResourceId;
    use rust_decimal_macros::dec;

    fn wood() -> TradeItem {
        TradeItem::Resource(ResourceId::from("WOOD"))
    }

    #[test]
    fn builder_produces_valid_entry() {
        let giver = CharacterId::new();
        let receiver = CharacterId::new();
        let result = TransactionBuilder::new(LedgerEntryType::Give, wood())
            .from(giver)
            .to(receiver)
            .quantity(dec!(0.25))
            .reason("GIVE".to_owned())
            .build();

        assert!(result.is_ok());
        if let Some(entry) = result.ok() {
            assert_eq!(entry.from_character, giver);
            assert_eq!(entry.to_character, receiver);
            assert_eq!(entry.quantity, dec!(0.25));
            assert_eq!(entry.item, wood());
        }
    }

    #[test]
    fn zero_quantity_rejected() {
        let result = TransactionBuilder::new(LedgerEntryType::Give, wood())
            .from(CharacterId::new())
            .to(CharacterId::new())
            .quantity(Decimal::ZERO)
            .reason("GIVE".to_owned())
            .build();

        assert!(matches!(result.err(), Some(LedgerError::ZeroQuantity)));
    }

    #[test]
    fn negative_quantity_rejected() {
        let result = TransactionBuilder::new(LedgerEntryType::Take, wood())
            .from(CharacterId::new())
            .to(CharacterId::new())
            .quantity(dec!(-3))
            .reason("TAKE".to_owned())
            .build();

        assert!(matches!(
            result.err(),
            Some(LedgerError::NegativeQuantity { .. })
        ));
    }

    #[test]
    fn self_transfer_rejected() {
        let character = CharacterId::new();
        let result = TransactionBuilder::new(LedgerEntryType::Give, wood())
            .from(character)
            .to(character)
            .quantity(Decimal::ONE)
            .reason("GIVE".to_owned())
            .build();

        assert!(matches!(result.err(), Some(LedgerError::SameCharacter(c)) if c == character));
    }

    #[test]
    fn missing_receiver_rejected() {
        let result = TransactionBuilder::new(LedgerEntryType::Deal, wood())
            .from(CharacterId::new())
            .quantity(Decimal::ONE)
            .reason("DEAL".to_owned())
            .build();

        assert!(matches!(
            result.err(),
            Some(LedgerError::MissingField("to_character"))
        ));
    }
}
