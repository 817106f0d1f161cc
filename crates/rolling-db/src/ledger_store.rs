//! Ledger persistence.
//!
//! The in-memory ledger only ever holds committed entries once the
//! outermost savepoint closes, so the engine drains it after each request
//! and appends the batch here. Rows are never updated.

use chrono::{DateTime, Utc};
use rolling_types::{
    CharacterId, LedgerEntry, LedgerEntryId, LedgerEntryType, ResourceId, StuffType, TradeItem,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Default batch size for ledger inserts.
const DEFAULT_BATCH_SIZE: usize = 200;

const SELECT_COLUMNS: &str = "SELECT id, entry_type::TEXT AS entry_type, from_character, to_character, item_kind::TEXT AS item_kind, item_id, quantity, reason, reference_id, created_at FROM ledger";

/// Operations on the `ledger` table.
pub struct LedgerStore<'a> {
    pool: &'a PgPool,
    batch_size: usize,
}

impl<'a> LedgerStore<'a> {
    /// Create a ledger store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the batch size for inserts. Zero is treated as one.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = if size == 0 { 1 } else { size };
        self
    }

    /// Append ledger entries.
    ///
    /// Each batch is a single `INSERT ... SELECT FROM UNNEST` inside its
    /// own transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if an insert fails. Batches committed
    /// before the failure stay committed.
    pub async fn batch_insert(&self, entries: &[LedgerEntry]) -> Result<(), DbError> {
        if entries.is_empty() {
            return Ok(());
        }

        for chunk in entries.chunks(self.batch_size) {
            let mut tx = self.pool.begin().await?;

            let len = chunk.len();
            let mut ids = Vec::with_capacity(len);
            let mut entry_types = Vec::with_capacity(len);
            let mut from_characters = Vec::with_capacity(len);
            let mut to_characters = Vec::with_capacity(len);
            let mut item_kinds = Vec::with_capacity(len);
            let mut item_ids = Vec::with_capacity(len);
            let mut quantities = Vec::with_capacity(len);
            let mut reasons = Vec::with_capacity(len);
            let mut reference_ids: Vec<Option<Uuid>> = Vec::with_capacity(len);
            let mut timestamps = Vec::with_capacity(len);

            for entry in chunk {
                let (kind, item_id) = trade_item_to_db(&entry.item);
                ids.push(entry.id.into_inner());
                entry_types.push(ledger_entry_type_to_db(entry.entry_type).to_owned());
                from_characters.push(entry.from_character.into_inner());
                to_characters.push(entry.to_character.into_inner());
                item_kinds.push(kind.to_owned());
                item_ids.push(item_id.to_owned());
                quantities.push(entry.quantity);
                reasons.push(entry.reason.clone());
                reference_ids.push(entry.reference_id);
                timestamps.push(entry.created_at);
            }

            sqlx::query(
                r"INSERT INTO ledger (id, entry_type, from_character, to_character, item_kind, item_id, quantity, reason, reference_id, created_at)
                  SELECT * FROM UNNEST($1::UUID[], $2::ledger_entry_type[], $3::UUID[], $4::UUID[], $5::trade_item_kind[], $6::TEXT[], $7::NUMERIC[], $8::TEXT[], $9::UUID[], $10::TIMESTAMPTZ[])",
            )
            .bind(&ids)
            .bind(&entry_types)
            .bind(&from_characters)
            .bind(&to_characters)
            .bind(&item_kinds)
            .bind(&item_ids)
            .bind(&quantities)
            .bind(&reasons)
            .bind(&reference_ids)
            .bind(&timestamps)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
        }

        tracing::debug!(count = entries.len(), "Inserted ledger entries (batch UNNEST)");
        Ok(())
    }

    /// Entries where a character gave or received something, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn entries_for_character(
        &self,
        character: CharacterId,
    ) -> Result<Vec<LedgerRow>, DbError> {
        let rows = sqlx::query_as::<_, LedgerRow>(&format!(
            "{SELECT_COLUMNS} WHERE from_character = $1 OR to_character = $1 ORDER BY created_at, id"
        ))
        .bind(character.into_inner())
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Entries recorded for one reference, such as every transfer of a deal.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn entries_for_reference(&self, reference_id: Uuid) -> Result<Vec<LedgerRow>, DbError> {
        let rows = sqlx::query_as::<_, LedgerRow>(&format!(
            "{SELECT_COLUMNS} WHERE reference_id = $1 ORDER BY created_at, id"
        ))
        .bind(reference_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

/// A row from the `ledger` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LedgerRow {
    /// Ledger entry UUID.
    pub id: Uuid,
    /// Entry type as a string (cast from the `PostgreSQL` enum).
    pub entry_type: String,
    /// Giver.
    pub from_character: Uuid,
    /// Receiver.
    pub to_character: Uuid,
    /// `resource` or `stuff`.
    pub item_kind: String,
    /// Resource id or stuff type.
    pub item_id: String,
    /// Quantity in base unit, or a count of stuffs.
    pub quantity: Decimal,
    /// Free-text reason.
    pub reason: String,
    /// Related offer or other record.
    pub reference_id: Option<Uuid>,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
}

impl LedgerRow {
    /// Rebuild the domain entry.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::CorruptRow`] for an unknown entry type or item kind.
    pub fn into_entry(self) -> Result<LedgerEntry, DbError> {
        let entry_type = ledger_entry_type_from_db(&self.entry_type).ok_or_else(|| {
            corrupt(format!("unknown entry type \"{}\"", self.entry_type))
        })?;
        let item = match self.item_kind.as_str() {
            "resource" => TradeItem::Resource(ResourceId::new(self.item_id)),
            "stuff" => TradeItem::Stuff(StuffType::new(self.item_id)),
            other => return Err(corrupt(format!("unknown item kind \"{other}\""))),
        };
        Ok(LedgerEntry {
            id: LedgerEntryId::from(self.id),
            entry_type,
            from_character: CharacterId::from(self.from_character),
            to_character: CharacterId::from(self.to_character),
            item,
            quantity: self.quantity,
            reason: self.reason,
            reference_id: self.reference_id,
            created_at: self.created_at,
        })
    }
}

const fn corrupt(reason: String) -> DbError {
    DbError::CorruptRow {
        table: "ledger",
        reason,
    }
}

/// Convert a [`LedgerEntryType`] to its `PostgreSQL` enum string.
const fn ledger_entry_type_to_db(entry_type: LedgerEntryType) -> &'static str {
    match entry_type {
        LedgerEntryType::Give => "give",
        LedgerEntryType::Take => "take",
        LedgerEntryType::Deal => "deal",
    }
}

fn ledger_entry_type_from_db(raw: &str) -> Option<LedgerEntryType> {
    match raw {
        "give" => Some(LedgerEntryType::Give),
        "take" => Some(LedgerEntryType::Take),
        "deal" => Some(LedgerEntryType::Deal),
        _ => None,
    }
}

/// Split a [`TradeItem`] into its `trade_item_kind` and key.
fn trade_item_to_db(item: &TradeItem) -> (&'static str, &str) {
    match item {
        TradeItem::Resource(id) => ("resource", id.as_str()),
        TradeItem::Stuff(stuff_type) => ("stuff", stuff_type.as_str()),
    }
}
