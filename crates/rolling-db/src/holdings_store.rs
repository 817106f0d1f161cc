//! Holdings snapshots.
//!
//! A snapshot captures every resource row and every stuff at one moment.
//! Locations and equip slots are stored as JSONB in their serde form, so
//! the tables do not need to track the shape of [`StorageLocation`].

use chrono::{DateTime, Utc};
use rolling_types::{
    EquipSlot, ResourceHolding, ResourceId, StorageLocation, Stuff, StuffId, StuffType,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Holdings loaded back from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldingsSnapshot {
    /// Snapshot identifier.
    pub id: Uuid,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
    /// Resource rows, in the order they were saved.
    pub resources: Vec<ResourceHolding>,
    /// Stuffs.
    pub stuffs: Vec<Stuff>,
}

/// Operations on the snapshot tables.
pub struct HoldingsStore<'a> {
    pool: &'a PgPool,
}

impl<'a> HoldingsStore<'a> {
    /// Create a holdings store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Save a snapshot in one transaction and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if a location cannot be encoded,
    /// [`DbError::Config`] if there are more rows than a snapshot can
    /// count, and [`DbError::Postgres`] if an insert fails.
    pub async fn save(
        &self,
        resources: &[ResourceHolding],
        stuffs: &[Stuff],
    ) -> Result<Uuid, DbError> {
        let id = Uuid::now_v7();
        let resource_count = count(resources.len())?;
        let stuff_count = count(stuffs.len())?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO holdings_snapshots (id, resource_rows, stuff_count) VALUES ($1, $2, $3)",
        )
        .bind(id)
        .bind(resource_count)
        .bind(stuff_count)
        .execute(&mut *tx)
        .await?;

        if !resources.is_empty() {
            let mut positions = Vec::with_capacity(resources.len());
            let mut locations = Vec::with_capacity(resources.len());
            let mut resource_ids = Vec::with_capacity(resources.len());
            let mut quantities = Vec::with_capacity(resources.len());
            for (position, row) in resources.iter().enumerate() {
                positions.push(count(position)?);
                locations.push(serde_json::to_value(row.location)?);
                resource_ids.push(row.resource_id.as_str().to_owned());
                quantities.push(row.quantity);
            }
            sqlx::query(
                r"INSERT INTO snapshot_resources (snapshot_id, position, location, resource_id, quantity)
                  SELECT $1, * FROM UNNEST($2::INTEGER[], $3::JSONB[], $4::TEXT[], $5::NUMERIC[])",
            )
            .bind(id)
            .bind(&positions)
            .bind(&locations)
            .bind(&resource_ids)
            .bind(&quantities)
            .execute(&mut *tx)
            .await?;
        }

        if !stuffs.is_empty() {
            let mut ids = Vec::with_capacity(stuffs.len());
            let mut types = Vec::with_capacity(stuffs.len());
            let mut locations = Vec::with_capacity(stuffs.len());
            let mut fillings: Vec<Option<String>> = Vec::with_capacity(stuffs.len());
            let mut filled_values: Vec<Option<Decimal>> = Vec::with_capacity(stuffs.len());
            let mut slots: Vec<Option<String>> = Vec::with_capacity(stuffs.len());
            for stuff in stuffs {
                ids.push(stuff.id.into_inner());
                types.push(stuff.stuff_type.as_str().to_owned());
                locations.push(serde_json::to_value(stuff.location)?);
                fillings.push(
                    stuff
                        .filled_with_resource
                        .as_ref()
                        .map(|r| r.as_str().to_owned()),
                );
                filled_values.push(stuff.filled_value);
                slots.push(stuff.equipped.map(slot_to_db).map(str::to_owned));
            }
            sqlx::query(
                r"INSERT INTO snapshot_stuffs (snapshot_id, id, stuff_type, location, filled_with_resource, filled_value, equipped)
                  SELECT $1, * FROM UNNEST($2::UUID[], $3::TEXT[], $4::JSONB[], $5::TEXT[], $6::NUMERIC[], $7::TEXT[])",
            )
            .bind(id)
            .bind(&ids)
            .bind(&types)
            .bind(&locations)
            .bind(&fillings)
            .bind(&filled_values)
            .bind(&slots)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(
            snapshot_id = %id,
            resource_rows = resources.len(),
            stuffs = stuffs.len(),
            "Saved holdings snapshot"
        );
        Ok(id)
    }

    /// Id of the most recent snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn latest_id(&self) -> Result<Option<Uuid>, DbError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM holdings_snapshots ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(self.pool)
        .await?;
        Ok(id)
    }

    /// Load a snapshot back.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails and
    /// [`DbError::CorruptRow`] or [`DbError::Serialization`] if a stored
    /// row cannot be decoded. Returns `Ok(None)` for an unknown id.
    pub async fn load(&self, id: Uuid) -> Result<Option<HoldingsSnapshot>, DbError> {
        let Some(created_at) = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT created_at FROM holdings_snapshots WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let resource_rows = sqlx::query_as::<_, ResourceRow>(
            r"SELECT location, resource_id, quantity FROM snapshot_resources
              WHERE snapshot_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        let stuff_rows = sqlx::query_as::<_, StuffRow>(
            r"SELECT id, stuff_type, location, filled_with_resource, filled_value, equipped
              FROM snapshot_stuffs WHERE snapshot_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        let resources = resource_rows
            .into_iter()
            .map(ResourceRow::into_holding)
            .collect::<Result<Vec<_>, _>>()?;
        let stuffs = stuff_rows
            .into_iter()
            .map(StuffRow::into_stuff)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(snapshot_id = %id, "Loaded holdings snapshot");
        Ok(Some(HoldingsSnapshot {
            id,
            created_at,
            resources,
            stuffs,
        }))
    }
}

#[derive(sqlx::FromRow)]
struct ResourceRow {
    location: serde_json::Value,
    resource_id: String,
    quantity: Decimal,
}

impl ResourceRow {
    fn into_holding(self) -> Result<ResourceHolding, DbError> {
        Ok(ResourceHolding {
            location: serde_json::from_value::<StorageLocation>(self.location)?,
            resource_id: ResourceId::new(self.resource_id),
            quantity: self.quantity,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StuffRow {
    id: Uuid,
    stuff_type: String,
    location: serde_json::Value,
    filled_with_resource: Option<String>,
    filled_value: Option<Decimal>,
    equipped: Option<String>,
}

impl StuffRow {
    fn into_stuff(self) -> Result<Stuff, DbError> {
        let equipped = match self.equipped.as_deref() {
            None => None,
            Some(raw) => Some(slot_from_db(raw).ok_or_else(|| DbError::CorruptRow {
                table: "snapshot_stuffs",
                reason: format!("unknown equip slot \"{raw}\""),
            })?),
        };
        Ok(Stuff {
            id: StuffId::from(self.id),
            stuff_type: StuffType::new(self.stuff_type),
            location: serde_json::from_value::<StorageLocation>(self.location)?,
            filled_with_resource: self.filled_with_resource.map(ResourceId::new),
            filled_value: self.filled_value,
            equipped,
        })
    }
}

fn count(len: usize) -> Result<i32, DbError> {
    i32::try_from(len).map_err(|e| DbError::Config(format!("Too many rows for a snapshot ({e})")))
}

const fn slot_to_db(slot: EquipSlot) -> &'static str {
    match slot {
        EquipSlot::Weapon => "weapon",
        EquipSlot::Shield => "shield",
        EquipSlot::Armor => "armor",
        EquipSlot::Bag => "bag",
    }
}

fn slot_from_db(raw: &str) -> Option<EquipSlot> {
    match raw {
        "weapon" => Some(EquipSlot::Weapon),
        "shield" => Some(EquipSlot::Shield),
        "armor" => Some(EquipSlot::Armor),
        "bag" => Some(EquipSlot::Bag),
        _ => None,
    }
}
