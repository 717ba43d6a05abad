//! Database-specific error types and conversions.

use fieldkit_core::error::FieldkitError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record decode failed: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for FieldkitError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => FieldkitError::NotFound { entity, id },
            other => FieldkitError::Storage(other.to_string()),
        }
    }
}
