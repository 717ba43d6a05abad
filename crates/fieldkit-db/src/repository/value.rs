//! SurrealDB implementation of [`ValueRepository`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use fieldkit_core::error::FieldkitResult;
use fieldkit_core::models::definition::EntityType;
use fieldkit_core::models::value::{AttrValue, FieldValue, UpsertFieldValue};
use fieldkit_core::repository::ValueRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::{parse_entity_type, parse_uuid};

/// Deterministic record id for a value tuple.
///
/// UUID v5 over the logical key gives the UNIQUE tuple index a
/// single-record identity: an UPSERT by record id is an atomic
/// insert-or-overwrite with last-write-wins semantics, no read step.
pub fn value_record_id(
    tenant_id: Uuid,
    field_id: Uuid,
    entity_type: EntityType,
    entity_id: &str,
) -> Uuid {
    let key = format!(
        "{tenant_id}/{field_id}/{}/{entity_id}",
        entity_type.as_str()
    );
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
}

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct ValueRow {
    tenant_id: String,
    field_id: String,
    entity_type: String,
    entity_id: String,
    value: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ValueRow {
    fn into_field_value(self, id: Uuid) -> Result<FieldValue, DbError> {
        let value = match self.value {
            None => None,
            Some(raw) => AttrValue::from_json(raw)
                .map_err(|e| DbError::Decode(format!("invalid stored value: {e}")))?,
        };
        Ok(FieldValue {
            id,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            field_id: parse_uuid("field", &self.field_id)?,
            entity_type: parse_entity_type(&self.entity_type)?,
            entity_id: self.entity_id,
            value,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct ValueRowWithId {
    record_id: String,
    tenant_id: String,
    field_id: String,
    entity_type: String,
    entity_id: String,
    value: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ValueRowWithId {
    fn try_into_field_value(self) -> Result<FieldValue, DbError> {
        let id = parse_uuid("record", &self.record_id)?;
        let row = ValueRow {
            tenant_id: self.tenant_id,
            field_id: self.field_id,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            value: self.value,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        row.into_field_value(id)
    }
}

const UPSERT_SET: &str = "\
tenant_id = $tenant_id, \
field_id = $field_id, \
entity_type = $entity_type, \
entity_id = $entity_id, \
value = $value, \
updated_at = time::now()";

/// SurrealDB implementation of the field-value store.
#[derive(Clone)]
pub struct SurrealValueRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealValueRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, FieldValue>, DbError> {
        let targets = (0..ids.len())
            .map(|i| format!("type::record('field_value', $id_{i})"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut builder = self.db.query(format!(
            "SELECT meta::id(id) AS record_id, * FROM {targets}"
        ));
        for (i, id) in ids.iter().enumerate() {
            builder = builder.bind((format!("id_{i}"), id.to_string()));
        }

        let mut result = builder.await?;
        let rows: Vec<ValueRowWithId> = result.take(0)?;

        let mut by_id = HashMap::with_capacity(rows.len());
        for row in rows {
            let value = row.try_into_field_value()?;
            by_id.insert(value.id, value);
        }
        Ok(by_id)
    }
}

impl<C: Connection> ValueRepository for SurrealValueRepository<C> {
    async fn list_for_entity(
        &self,
        tenant_id: Uuid,
        entity_type: EntityType,
        entity_id: &str,
    ) -> FieldkitResult<Vec<FieldValue>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM field_value \
                 WHERE tenant_id = $tenant_id \
                 AND entity_type = $entity_type \
                 AND entity_id = $entity_id \
                 ORDER BY created_at ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("entity_type", entity_type.as_str().to_string()))
            .bind(("entity_id", entity_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ValueRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_field_value())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }

    async fn upsert(&self, input: UpsertFieldValue) -> FieldkitResult<FieldValue> {
        let id = value_record_id(
            input.tenant_id,
            input.field_id,
            input.entity_type,
            &input.entity_id,
        );
        let id_str = id.to_string();

        let result = self
            .db
            .query(format!(
                "UPSERT type::record('field_value', $id) SET {UPSERT_SET}"
            ))
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("field_id", input.field_id.to_string()))
            .bind(("entity_type", input.entity_type.as_str().to_string()))
            .bind(("entity_id", input.entity_id))
            .bind(("value", input.value.as_ref().map(AttrValue::to_json)))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<ValueRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "field_value".into(),
            id: id_str,
        })?;

        Ok(row.into_field_value(id)?)
    }

    async fn upsert_many(&self, inputs: Vec<UpsertFieldValue>) -> FieldkitResult<Vec<FieldValue>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = inputs
            .iter()
            .map(|input| {
                value_record_id(
                    input.tenant_id,
                    input.field_id,
                    input.entity_type,
                    &input.entity_id,
                )
            })
            .collect();

        // All upserts ride in one transaction: a failure on any row
        // aborts the batch with nothing applied.
        let mut statements = vec!["BEGIN TRANSACTION;".to_string()];
        for i in 0..inputs.len() {
            statements.push(format!(
                "UPSERT type::record('field_value', $id_{i}) SET \
                 tenant_id = $tenant_id_{i}, \
                 field_id = $field_id_{i}, \
                 entity_type = $entity_type_{i}, \
                 entity_id = $entity_id_{i}, \
                 value = $value_{i}, \
                 updated_at = time::now();"
            ));
        }
        statements.push("COMMIT TRANSACTION;".to_string());

        let mut builder = self.db.query(statements.join("\n"));
        for (i, (input, id)) in inputs.iter().zip(&ids).enumerate() {
            builder = builder
                .bind((format!("id_{i}"), id.to_string()))
                .bind((format!("tenant_id_{i}"), input.tenant_id.to_string()))
                .bind((format!("field_id_{i}"), input.field_id.to_string()))
                .bind((
                    format!("entity_type_{i}"),
                    input.entity_type.as_str().to_string(),
                ))
                .bind((format!("entity_id_{i}"), input.entity_id.clone()))
                .bind((
                    format!("value_{i}"),
                    input.value.as_ref().map(AttrValue::to_json),
                ));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        // Read the committed rows back outside the transaction and
        // return them in input order.
        let mut by_id = self.fetch_by_ids(&ids).await?;
        let mut items = Vec::with_capacity(ids.len());
        for id in &ids {
            let value = by_id.remove(id).ok_or_else(|| DbError::NotFound {
                entity: "field_value".into(),
                id: id.to_string(),
            })?;
            items.push(value);
        }

        Ok(items)
    }
}
