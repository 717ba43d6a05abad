//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Every operation takes a
//! `tenant_id` parameter to enforce data isolation. Multi-row
//! operations ([`DefinitionRepository::apply_display_orders`],
//! [`ValueRepository::upsert_many`]) must execute as a single storage
//! transaction: a mid-batch failure leaves nothing applied.

use uuid::Uuid;

use crate::error::FieldkitResult;
use crate::models::definition::{
    CreateFieldDefinition, DefinitionChanges, EntityType, FieldDefinition, FieldOrder,
};
use crate::models::value::{FieldValue, UpsertFieldValue};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

pub trait DefinitionRepository: Send + Sync {
    /// Persist a new definition. `display_order` has already been
    /// resolved by the caller (explicit or appended after the scope's
    /// maximum).
    fn create(
        &self,
        input: CreateFieldDefinition,
        display_order: i64,
    ) -> impl Future<Output = FieldkitResult<FieldDefinition>> + Send;

    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = FieldkitResult<FieldDefinition>> + Send;

    /// Lookup by machine name, matching active and inactive
    /// definitions alike (field codes are unique across both).
    fn get_by_code(
        &self,
        tenant_id: Uuid,
        entity_type: EntityType,
        field_code: &str,
    ) -> impl Future<Output = FieldkitResult<FieldDefinition>> + Send;

    /// All definitions of a tenant, across entity types.
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = FieldkitResult<PaginatedResult<FieldDefinition>>> + Send;

    /// Definitions of one entity type, ordered by
    /// (`display_order`, `id`) ascending.
    fn list_for_entity(
        &self,
        tenant_id: Uuid,
        entity_type: EntityType,
        include_inactive: bool,
    ) -> impl Future<Output = FieldkitResult<Vec<FieldDefinition>>> + Send;

    /// Highest `display_order` currently used in the scope, if any.
    fn max_display_order(
        &self,
        tenant_id: Uuid,
        entity_type: EntityType,
    ) -> impl Future<Output = FieldkitResult<Option<i64>>> + Send;

    /// Apply the mutable subset of a definition. Immutability of
    /// `field_code`/`field_kind` is guaranteed upstream by the
    /// registry and by the shape of [`DefinitionChanges`].
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        changes: DefinitionChanges,
    ) -> impl Future<Output = FieldkitResult<FieldDefinition>> + Send;

    /// Apply a batch of display orders in one transaction.
    fn apply_display_orders(
        &self,
        tenant_id: Uuid,
        entity_type: EntityType,
        orders: &[FieldOrder],
    ) -> impl Future<Output = FieldkitResult<()>> + Send;
}

pub trait ValueRepository: Send + Sync {
    /// All stored values for one entity instance.
    fn list_for_entity(
        &self,
        tenant_id: Uuid,
        entity_type: EntityType,
        entity_id: &str,
    ) -> impl Future<Output = FieldkitResult<Vec<FieldValue>>> + Send;

    /// Insert-or-overwrite the value for one tuple (last write wins).
    fn upsert(
        &self,
        input: UpsertFieldValue,
    ) -> impl Future<Output = FieldkitResult<FieldValue>> + Send;

    /// Upsert a whole batch in one transaction. Returns the stored
    /// rows in input order.
    fn upsert_many(
        &self,
        inputs: Vec<UpsertFieldValue>,
    ) -> impl Future<Output = FieldkitResult<Vec<FieldValue>>> + Send;
}
