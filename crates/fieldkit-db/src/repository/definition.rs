//! SurrealDB implementation of [`DefinitionRepository`].

use chrono::{DateTime, Utc};
use fieldkit_core::error::FieldkitResult;
use fieldkit_core::models::definition::{
    CreateFieldDefinition, DefinitionChanges, EntityType, FieldDefinition, FieldOption, FieldOrder,
    ValidationRules,
};
use fieldkit_core::models::value::AttrValue;
use fieldkit_core::repository::{DefinitionRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::{parse_entity_type, parse_field_kind, parse_uuid};

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct DefinitionRow {
    tenant_id: String,
    entity_type: String,
    field_code: String,
    field_label: String,
    description: Option<String>,
    display_order: i64,
    field_kind: String,
    is_required: bool,
    is_active: bool,
    default_value: Option<serde_json::Value>,
    validation_rules: serde_json::Value,
    options: Option<serde_json::Value>,
    ui_config: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DefinitionRow {
    fn into_definition(self, id: Uuid) -> Result<FieldDefinition, DbError> {
        let tenant_id = parse_uuid("tenant", &self.tenant_id)?;
        let entity_type = parse_entity_type(&self.entity_type)?;
        let field_kind = parse_field_kind(&self.field_kind)?;

        let validation_rules: ValidationRules = serde_json::from_value(self.validation_rules)
            .map_err(|e| DbError::Decode(format!("invalid validation_rules: {e}")))?;
        let options: Option<Vec<FieldOption>> = self
            .options
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| DbError::Decode(format!("invalid options: {e}")))?;
        let default_value = match self.default_value {
            None => None,
            Some(raw) => AttrValue::from_json(raw)
                .map_err(|e| DbError::Decode(format!("invalid default_value: {e}")))?,
        };

        Ok(FieldDefinition {
            id,
            tenant_id,
            entity_type,
            field_code: self.field_code,
            field_label: self.field_label,
            description: self.description,
            display_order: self.display_order,
            field_kind,
            is_required: self.is_required,
            is_active: self.is_active,
            default_value,
            validation_rules,
            options,
            ui_config: self.ui_config,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct DefinitionRowWithId {
    record_id: String,
    tenant_id: String,
    entity_type: String,
    field_code: String,
    field_label: String,
    description: Option<String>,
    display_order: i64,
    field_kind: String,
    is_required: bool,
    is_active: bool,
    default_value: Option<serde_json::Value>,
    validation_rules: serde_json::Value,
    options: Option<serde_json::Value>,
    ui_config: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DefinitionRowWithId {
    fn try_into_definition(self) -> Result<FieldDefinition, DbError> {
        let id = parse_uuid("record", &self.record_id)?;
        let row = DefinitionRow {
            tenant_id: self.tenant_id,
            entity_type: self.entity_type,
            field_code: self.field_code,
            field_label: self.field_label,
            description: self.description,
            display_order: self.display_order,
            field_kind: self.field_kind,
            is_required: self.is_required,
            is_active: self.is_active,
            default_value: self.default_value,
            validation_rules: self.validation_rules,
            options: self.options,
            ui_config: self.ui_config,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        row.into_definition(id)
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Row struct for the max-display-order aggregate.
#[derive(Debug, SurrealValue)]
struct MaxOrderRow {
    max_order: Option<i64>,
}

const SELECT_WITH_ID: &str = "SELECT meta::id(id) AS record_id, * FROM field_definition";

fn encode_rules(rules: &ValidationRules) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(rules).map_err(|e| DbError::Decode(format!("validation_rules: {e}")))
}

fn encode_options(options: &Option<Vec<FieldOption>>) -> Result<Option<serde_json::Value>, DbError> {
    options
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| DbError::Decode(format!("options: {e}")))
}

/// SurrealDB implementation of the field-definition repository.
#[derive(Clone)]
pub struct SurrealDefinitionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDefinitionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> DefinitionRepository for SurrealDefinitionRepository<C> {
    async fn create(
        &self,
        input: CreateFieldDefinition,
        display_order: i64,
    ) -> FieldkitResult<FieldDefinition> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('field_definition', $id) SET \
                 tenant_id = $tenant_id, \
                 entity_type = $entity_type, \
                 field_code = $field_code, \
                 field_label = $field_label, \
                 description = $description, \
                 display_order = $display_order, \
                 field_kind = $field_kind, \
                 is_required = $is_required, \
                 is_active = true, \
                 default_value = $default_value, \
                 validation_rules = $validation_rules, \
                 options = $options, \
                 ui_config = $ui_config",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("entity_type", input.entity_type.as_str().to_string()))
            .bind(("field_code", input.field_code))
            .bind(("field_label", input.field_label))
            .bind(("description", input.description))
            .bind(("display_order", display_order))
            .bind(("field_kind", input.field_kind.as_str().to_string()))
            .bind(("is_required", input.is_required))
            .bind((
                "default_value",
                input.default_value.as_ref().map(AttrValue::to_json),
            ))
            .bind(("validation_rules", encode_rules(&input.validation_rules)?))
            .bind(("options", encode_options(&input.options)?))
            .bind((
                "ui_config",
                input
                    .ui_config
                    .unwrap_or(serde_json::Value::Object(Default::default())),
            ))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<DefinitionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "field_definition".into(),
            id: id_str,
        })?;

        Ok(row.into_definition(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> FieldkitResult<FieldDefinition> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('field_definition', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DefinitionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "field_definition".into(),
            id: id_str,
        })?;

        Ok(row.into_definition(id)?)
    }

    async fn get_by_code(
        &self,
        tenant_id: Uuid,
        entity_type: EntityType,
        field_code: &str,
    ) -> FieldkitResult<FieldDefinition> {
        let code = field_code.to_string();

        let mut result = self
            .db
            .query(format!(
                "{SELECT_WITH_ID} \
                 WHERE tenant_id = $tenant_id \
                 AND entity_type = $entity_type \
                 AND field_code = $field_code"
            ))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("entity_type", entity_type.as_str().to_string()))
            .bind(("field_code", code.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DefinitionRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "field_definition".into(),
            id: format!("entity_type={entity_type},field_code={code}"),
        })?;

        Ok(row.try_into_definition()?)
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> FieldkitResult<PaginatedResult<FieldDefinition>> {
        let tenant = tenant_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM field_definition \
                 WHERE tenant_id = $tenant_id GROUP ALL",
            )
            .bind(("tenant_id", tenant.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "{SELECT_WITH_ID} \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY entity_type ASC, display_order ASC, record_id ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("tenant_id", tenant))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DefinitionRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_definition())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_for_entity(
        &self,
        tenant_id: Uuid,
        entity_type: EntityType,
        include_inactive: bool,
    ) -> FieldkitResult<Vec<FieldDefinition>> {
        let active_clause = if include_inactive {
            ""
        } else {
            "AND is_active = true "
        };

        let mut result = self
            .db
            .query(format!(
                "{SELECT_WITH_ID} \
                 WHERE tenant_id = $tenant_id \
                 AND entity_type = $entity_type \
                 {active_clause}\
                 ORDER BY display_order ASC, record_id ASC"
            ))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("entity_type", entity_type.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DefinitionRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_definition())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }

    async fn max_display_order(
        &self,
        tenant_id: Uuid,
        entity_type: EntityType,
    ) -> FieldkitResult<Option<i64>> {
        let mut result = self
            .db
            .query(
                "SELECT math::max(display_order) AS max_order \
                 FROM field_definition \
                 WHERE tenant_id = $tenant_id \
                 AND entity_type = $entity_type \
                 GROUP ALL",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("entity_type", entity_type.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MaxOrderRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().and_then(|r| r.max_order))
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        changes: DefinitionChanges,
    ) -> FieldkitResult<FieldDefinition> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if changes.field_label.is_some() {
            sets.push("field_label = $field_label");
        }
        if changes.description.is_some() {
            sets.push("description = $description");
        }
        if changes.display_order.is_some() {
            sets.push("display_order = $display_order");
        }
        if changes.is_required.is_some() {
            sets.push("is_required = $is_required");
        }
        if changes.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        if changes.default_value.is_some() {
            sets.push("default_value = $default_value");
        }
        if changes.validation_rules.is_some() {
            sets.push("validation_rules = $validation_rules");
        }
        if changes.options.is_some() {
            sets.push("options = $options");
        }
        if changes.ui_config.is_some() {
            sets.push("ui_config = $ui_config");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('field_definition', $id) \
             SET {} \
             WHERE tenant_id = $tenant_id",
            sets.join(", "),
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()));

        if let Some(label) = changes.field_label {
            builder = builder.bind(("field_label", label));
        }
        if let Some(description) = changes.description {
            builder = builder.bind(("description", description));
        }
        if let Some(order) = changes.display_order {
            builder = builder.bind(("display_order", order));
        }
        if let Some(required) = changes.is_required {
            builder = builder.bind(("is_required", required));
        }
        if let Some(active) = changes.is_active {
            builder = builder.bind(("is_active", active));
        }
        if let Some(default_value) = changes.default_value {
            builder = builder.bind((
                "default_value",
                default_value.as_ref().map(AttrValue::to_json),
            ));
        }
        if let Some(rules) = changes.validation_rules {
            builder = builder.bind(("validation_rules", encode_rules(&rules)?));
        }
        if let Some(options) = changes.options {
            builder = builder.bind(("options", encode_options(&Some(options))?));
        }
        if let Some(ui_config) = changes.ui_config {
            builder = builder.bind(("ui_config", ui_config));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<DefinitionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "field_definition".into(),
            id: id_str,
        })?;

        Ok(row.into_definition(id)?)
    }

    async fn apply_display_orders(
        &self,
        tenant_id: Uuid,
        entity_type: EntityType,
        orders: &[FieldOrder],
    ) -> FieldkitResult<()> {
        if orders.is_empty() {
            return Ok(());
        }

        // One transaction: either every definition gets its new order
        // or none does. The per-statement WHERE keeps a stray id from
        // touching another tenant or entity type.
        let mut statements = vec!["BEGIN TRANSACTION;".to_string()];
        for i in 0..orders.len() {
            statements.push(format!(
                "UPDATE type::record('field_definition', $id_{i}) \
                 SET display_order = $order_{i}, updated_at = time::now() \
                 WHERE tenant_id = $tenant_id \
                 AND entity_type = $entity_type;"
            ));
        }
        statements.push("COMMIT TRANSACTION;".to_string());

        let mut builder = self
            .db
            .query(statements.join("\n"))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("entity_type", entity_type.as_str().to_string()));

        for (i, order) in orders.iter().enumerate() {
            builder = builder
                .bind((format!("id_{i}"), order.field_id.to_string()))
                .bind((format!("order_{i}"), order.display_order));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }
}
