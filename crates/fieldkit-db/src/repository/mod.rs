//! SurrealDB repository implementations.

mod definition;
mod value;

pub use definition::SurrealDefinitionRepository;
pub use value::{SurrealValueRepository, value_record_id};

use fieldkit_core::models::definition::{EntityType, FieldKind};

use crate::error::DbError;

pub(crate) fn parse_entity_type(s: &str) -> Result<EntityType, DbError> {
    EntityType::parse(s).ok_or_else(|| DbError::Decode(format!("unknown entity type: {s}")))
}

pub(crate) fn parse_field_kind(s: &str) -> Result<FieldKind, DbError> {
    FieldKind::parse(s).ok_or_else(|| DbError::Decode(format!("unknown field kind: {s}")))
}

pub(crate) fn parse_uuid(field: &str, s: &str) -> Result<uuid::Uuid, DbError> {
    uuid::Uuid::parse_str(s).map_err(|e| DbError::Decode(format!("invalid {field} UUID: {e}")))
}
