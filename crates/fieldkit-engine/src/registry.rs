//! Definition registry — CRUD and ordering of field definitions.
//!
//! The registry owns the definition-level invariants: field codes are
//! unique per (tenant, entity type) among active and inactive
//! definitions; `field_code` and `field_kind` never change after
//! creation; options and validation rules must be consistent with the
//! field kind; display orders stay distinct within a scope after any
//! reorder.

use std::collections::BTreeSet;

use fieldkit_core::error::{FieldkitError, FieldkitResult};
use fieldkit_core::models::definition::{
    CreateFieldDefinition, DefinitionChanges, EntityType, FieldDefinition, FieldOrder,
    UpdateFieldDefinition,
};
use fieldkit_core::repository::{DefinitionRepository, PaginatedResult, Pagination};
use fieldkit_core::validate::{check_options, check_rules};
use tracing::debug;
use uuid::Uuid;

use crate::config::EngineConfig;

/// Definition registry service.
///
/// Generic over the repository implementation so the registry layer
/// has no dependency on the database crate.
#[derive(Clone)]
pub struct DefinitionRegistry<R: DefinitionRepository> {
    repo: R,
    config: EngineConfig,
}

impl<R: DefinitionRepository> DefinitionRegistry<R> {
    pub fn new(repo: R, config: EngineConfig) -> Self {
        Self { repo, config }
    }

    /// All definitions of a tenant, across entity types.
    pub async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> FieldkitResult<PaginatedResult<FieldDefinition>> {
        self.repo.list(tenant_id, pagination).await
    }

    /// Definitions for one entity type in display order. Inactive
    /// definitions are hidden unless explicitly requested.
    pub async fn list_for_entity(
        &self,
        tenant_id: Uuid,
        entity_type: EntityType,
        include_inactive: bool,
    ) -> FieldkitResult<Vec<FieldDefinition>> {
        self.repo
            .list_for_entity(tenant_id, entity_type, include_inactive)
            .await
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> FieldkitResult<FieldDefinition> {
        self.repo.get_by_id(tenant_id, id).await
    }

    pub async fn create(&self, input: CreateFieldDefinition) -> FieldkitResult<FieldDefinition> {
        self.check_field_code(&input.field_code)?;
        self.check_field_label(&input.field_label)?;
        self.check_option_count(input.options.as_deref())?;

        check_options(input.field_kind, input.options.as_deref())
            .map_err(FieldkitError::InvalidOptions)?;
        check_rules(&input.validation_rules, input.field_kind)
            .map_err(FieldkitError::InvalidRules)?;

        // The pre-check covers active and inactive definitions alike:
        // a retired code stays reserved for its stored values. Racing
        // creates are caught by the UNIQUE storage index.
        match self
            .repo
            .get_by_code(input.tenant_id, input.entity_type, &input.field_code)
            .await
        {
            Ok(_) => {
                return Err(FieldkitError::DuplicateFieldCode {
                    entity_type: input.entity_type.to_string(),
                    field_code: input.field_code,
                });
            }
            Err(FieldkitError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let display_order = match input.display_order {
            Some(order) => order,
            None => self
                .repo
                .max_display_order(input.tenant_id, input.entity_type)
                .await?
                .map_or(1, |max| max + 1),
        };

        let created = self.repo.create(input, display_order).await?;
        debug!(
            tenant = %created.tenant_id,
            entity_type = %created.entity_type,
            field_code = %created.field_code,
            "Created field definition"
        );
        Ok(created)
    }

    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        patch: UpdateFieldDefinition,
    ) -> FieldkitResult<FieldDefinition> {
        let stored = self.repo.get_by_id(tenant_id, id).await?;

        // A client may echo the stored code/kind back; only a
        // differing value is a mutation attempt.
        if let Some(code) = &patch.field_code {
            if *code != stored.field_code {
                return Err(FieldkitError::ImmutableField {
                    field: "field_code",
                });
            }
        }
        if let Some(kind) = patch.field_kind {
            if kind != stored.field_kind {
                return Err(FieldkitError::ImmutableField {
                    field: "field_kind",
                });
            }
        }

        if let Some(label) = &patch.field_label {
            self.check_field_label(label)?;
        }

        // Options/rules are checked against the *stored* kind — the
        // kind can never change, so a patch must stay consistent with
        // what values already conform to.
        let effective_options = patch.options.as_ref().or(stored.options.as_ref());
        self.check_option_count(effective_options.map(Vec::as_slice))?;
        check_options(stored.field_kind, effective_options.map(Vec::as_slice))
            .map_err(FieldkitError::InvalidOptions)?;

        let effective_rules = patch
            .validation_rules
            .as_ref()
            .unwrap_or(&stored.validation_rules);
        check_rules(effective_rules, stored.field_kind).map_err(FieldkitError::InvalidRules)?;

        let changes = DefinitionChanges {
            field_label: patch.field_label,
            description: patch.description,
            display_order: patch.display_order,
            is_required: patch.is_required,
            is_active: patch.is_active,
            default_value: patch.default_value,
            validation_rules: patch.validation_rules,
            options: patch.options,
            ui_config: patch.ui_config,
        };
        self.repo.update(tenant_id, id, changes).await
    }

    /// Soft-delete: sets `is_active = false`. Idempotent — retiring an
    /// already-inactive definition is a no-op, not an error.
    pub async fn soft_delete(&self, tenant_id: Uuid, id: Uuid) -> FieldkitResult<()> {
        let changes = DefinitionChanges {
            is_active: Some(false),
            ..Default::default()
        };
        self.repo.update(tenant_id, id, changes).await?;
        Ok(())
    }

    /// Apply a batch of display orders as one all-or-nothing unit.
    ///
    /// Every id must belong to the given (tenant, entity type) scope
    /// and the scope's resulting order set must be distinct; any
    /// violation rejects the whole batch with nothing applied.
    pub async fn reorder(
        &self,
        tenant_id: Uuid,
        entity_type: EntityType,
        orders: Vec<FieldOrder>,
    ) -> FieldkitResult<()> {
        if orders.is_empty() {
            return Ok(());
        }

        let scope = self
            .repo
            .list_for_entity(tenant_id, entity_type, true)
            .await?;

        let mut requested = BTreeSet::new();
        for order in &orders {
            if !requested.insert(order.field_id) {
                return Err(FieldkitError::ReorderConflict(format!(
                    "field {} appears more than once",
                    order.field_id
                )));
            }
            if !scope.iter().any(|def| def.id == order.field_id) {
                return Err(FieldkitError::ReorderConflict(format!(
                    "field {} does not belong to entity type '{entity_type}'",
                    order.field_id
                )));
            }
        }

        // Resulting order set = requested orders + untouched
        // definitions' existing orders; duplicates anywhere reject the
        // batch.
        let mut resulting = BTreeSet::new();
        for order in &orders {
            if !resulting.insert(order.display_order) {
                return Err(FieldkitError::ReorderConflict(format!(
                    "display order {} assigned twice",
                    order.display_order
                )));
            }
        }
        for def in &scope {
            if requested.contains(&def.id) {
                continue;
            }
            if !resulting.insert(def.display_order) {
                return Err(FieldkitError::ReorderConflict(format!(
                    "display order {} collides with field '{}'",
                    def.display_order, def.field_code
                )));
            }
        }

        self.repo
            .apply_display_orders(tenant_id, entity_type, &orders)
            .await?;
        debug!(
            tenant = %tenant_id,
            entity_type = %entity_type,
            fields = orders.len(),
            "Reordered field definitions"
        );
        Ok(())
    }

    fn check_field_code(&self, code: &str) -> FieldkitResult<()> {
        if code.is_empty() {
            return Err(FieldkitError::InvalidDefinition(
                "field_code must not be empty".into(),
            ));
        }
        if code.len() > self.config.max_field_code_length {
            return Err(FieldkitError::InvalidDefinition(format!(
                "field_code exceeds {} characters",
                self.config.max_field_code_length
            )));
        }
        let mut chars = code.chars();
        let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_lowercase());
        if !starts_alpha
            || !code
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(FieldkitError::InvalidDefinition(format!(
                "field_code '{code}' must match [a-z][a-z0-9_]*"
            )));
        }
        Ok(())
    }

    fn check_field_label(&self, label: &str) -> FieldkitResult<()> {
        if label.trim().is_empty() {
            return Err(FieldkitError::InvalidDefinition(
                "field_label must not be empty".into(),
            ));
        }
        if label.chars().count() > self.config.max_field_label_length {
            return Err(FieldkitError::InvalidDefinition(format!(
                "field_label exceeds {} characters",
                self.config.max_field_label_length
            )));
        }
        Ok(())
    }

    fn check_option_count(
        &self,
        options: Option<&[fieldkit_core::models::definition::FieldOption]>,
    ) -> FieldkitResult<()> {
        if let Some(options) = options {
            if options.len() > self.config.max_options {
                return Err(FieldkitError::InvalidOptions(format!(
                    "at most {} options are allowed",
                    self.config.max_options
                )));
            }
        }
        Ok(())
    }
}
