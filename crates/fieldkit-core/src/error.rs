//! Error types for the FieldKit system.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FieldkitError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Field code '{field_code}' already exists for entity type '{entity_type}'")]
    DuplicateFieldCode {
        entity_type: String,
        field_code: String,
    },

    #[error("'{field}' is immutable after creation")]
    ImmutableField { field: &'static str },

    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Invalid validation rules: {0}")]
    InvalidRules(String),

    #[error("Unknown field code(s): {}", codes.join(", "))]
    UnknownField { codes: Vec<String> },

    /// One entry per failing field. Every failure is collected before
    /// this error is returned, never just the first.
    #[error("Validation failed for {} field(s)", errors.len())]
    ValidationFailed { errors: BTreeMap<String, String> },

    #[error("Reorder conflict: {0}")]
    ReorderConflict(String),

    #[error("Bulk write exceeds the maximum of {max} fields")]
    BatchTooLarge { max: usize },

    #[error("Tenant context missing or invalid")]
    TenantContext,

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type FieldkitResult<T> = Result<T, FieldkitError>;
