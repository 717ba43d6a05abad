//! Validated value reads and writes, single and bulk.
//!
//! Writes resolve the owning definition, validate the candidate value
//! against it, and upsert. The bulk path is all-or-nothing: every
//! (definition, value) pair is validated first and every failure is
//! collected into a field-keyed error map; only a fully clean batch
//! reaches storage, where it rides a single transaction.

use std::collections::{BTreeMap, HashMap};

use fieldkit_core::error::{FieldkitError, FieldkitResult};
use fieldkit_core::models::definition::{EntityType, FieldDefinition};
use fieldkit_core::models::value::{AttrValue, EffectiveField, FieldValue, UpsertFieldValue};
use fieldkit_core::repository::{DefinitionRepository, ValueRepository};
use fieldkit_core::validate::{effective_default, validate};
use tracing::debug;
use uuid::Uuid;

use crate::config::EngineConfig;

/// Value store facade and bulk-write coordinator.
#[derive(Clone)]
pub struct ValueService<D: DefinitionRepository, V: ValueRepository> {
    definitions: D,
    values: V,
    config: EngineConfig,
}

impl<D: DefinitionRepository, V: ValueRepository> ValueService<D, V> {
    pub fn new(definitions: D, values: V, config: EngineConfig) -> Self {
        Self {
            definitions,
            values,
            config,
        }
    }

    /// All stored values for one entity instance.
    pub async fn values(
        &self,
        tenant_id: Uuid,
        entity_type: EntityType,
        entity_id: &str,
    ) -> FieldkitResult<Vec<FieldValue>> {
        self.values
            .list_for_entity(tenant_id, entity_type, entity_id)
            .await
    }

    /// Every active definition of the entity type joined with its
    /// stored value, or its resolved default when nothing is stored,
    /// in display order. This is the feed for the rendering
    /// collaborator.
    pub async fn values_with_definitions(
        &self,
        tenant_id: Uuid,
        entity_type: EntityType,
        entity_id: &str,
    ) -> FieldkitResult<Vec<EffectiveField>> {
        let definitions = self
            .definitions
            .list_for_entity(tenant_id, entity_type, false)
            .await?;
        let stored = self
            .values
            .list_for_entity(tenant_id, entity_type, entity_id)
            .await?;

        let mut by_field: HashMap<Uuid, Option<AttrValue>> = stored
            .into_iter()
            .map(|value| (value.field_id, value.value))
            .collect();

        Ok(definitions
            .into_iter()
            .map(|definition| {
                // A stored row wins even when its value is null — an
                // explicit clear suppresses the default.
                let effective_value = match by_field.remove(&definition.id) {
                    Some(stored) => stored,
                    None => effective_default(&definition),
                };
                EffectiveField {
                    definition,
                    effective_value,
                }
            })
            .collect())
    }

    /// Validate and upsert a single value.
    pub async fn set_one(
        &self,
        tenant_id: Uuid,
        entity_type: EntityType,
        entity_id: &str,
        field_code: &str,
        value: serde_json::Value,
    ) -> FieldkitResult<FieldValue> {
        let definition = match self
            .definitions
            .get_by_code(tenant_id, entity_type, field_code)
            .await
        {
            Ok(def) if def.is_active => def,
            Ok(_) | Err(FieldkitError::NotFound { .. }) => {
                return Err(FieldkitError::UnknownField {
                    codes: vec![field_code.to_string()],
                });
            }
            Err(e) => return Err(e),
        };

        let value = convert_and_validate(&definition, value).map_err(|message| {
            FieldkitError::ValidationFailed {
                errors: BTreeMap::from([(field_code.to_string(), message)]),
            }
        })?;

        self.values
            .upsert(UpsertFieldValue {
                tenant_id,
                field_id: definition.id,
                entity_type,
                entity_id: entity_id.to_string(),
                value,
            })
            .await
    }

    /// Validate and upsert a whole batch of values as one
    /// all-or-nothing unit.
    ///
    /// 1. Every field code must resolve to an active definition;
    ///    unresolved codes fail the batch with nothing written.
    /// 2. Every pair is validated and *all* failures are collected
    ///    into a field-keyed map — never just the first.
    /// 3. Only a fully clean batch is written, in one transaction.
    pub async fn set_many(
        &self,
        tenant_id: Uuid,
        entity_type: EntityType,
        entity_id: &str,
        entries: BTreeMap<String, serde_json::Value>,
    ) -> FieldkitResult<Vec<FieldValue>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        if entries.len() > self.config.max_bulk_fields {
            return Err(FieldkitError::BatchTooLarge {
                max: self.config.max_bulk_fields,
            });
        }

        let definitions = self
            .definitions
            .list_for_entity(tenant_id, entity_type, false)
            .await?;
        let by_code: HashMap<&str, &FieldDefinition> = definitions
            .iter()
            .map(|def| (def.field_code.as_str(), def))
            .collect();

        let unknown: Vec<String> = entries
            .keys()
            .filter(|code| !by_code.contains_key(code.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(FieldkitError::UnknownField { codes: unknown });
        }

        let mut errors = BTreeMap::new();
        let mut writes = Vec::with_capacity(entries.len());
        for (code, raw) in entries {
            let definition = by_code[code.as_str()];
            match convert_and_validate(definition, raw) {
                Ok(value) => writes.push(UpsertFieldValue {
                    tenant_id,
                    field_id: definition.id,
                    entity_type,
                    entity_id: entity_id.to_string(),
                    value,
                }),
                Err(message) => {
                    errors.insert(code, message);
                }
            }
        }
        if !errors.is_empty() {
            return Err(FieldkitError::ValidationFailed { errors });
        }

        let written = self.values.upsert_many(writes).await?;
        debug!(
            tenant = %tenant_id,
            entity_type = %entity_type,
            entity_id,
            fields = written.len(),
            "Bulk value write committed"
        );
        Ok(written)
    }
}

/// Convert raw JSON into the engine's tagged shape and validate it
/// against the definition. The error string is the end-user message.
fn convert_and_validate(
    definition: &FieldDefinition,
    raw: serde_json::Value,
) -> Result<Option<AttrValue>, String> {
    let value = AttrValue::from_json(raw).map_err(|e| e.to_string())?;
    validate(definition, value.as_ref()).map_err(|e| e.to_string())?;
    Ok(value)
}
