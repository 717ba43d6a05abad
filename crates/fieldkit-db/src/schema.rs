//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation. The untyped value payloads
//! (`default_value`, `value`) are the one deliberate exception:
//! values are attribute rows, not columns, and the engine validates
//! them at write time.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Field definitions (tenant scope)
-- =======================================================================
DEFINE TABLE field_definition SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE field_definition TYPE string;
DEFINE FIELD entity_type ON TABLE field_definition TYPE string \
    ASSERT $value IN ['material', 'work_order', 'project', 'ncr', \
    'machine', 'department', 'plant', 'organization', 'maintenance', \
    'production_log', 'quality', 'shift', 'lane', 'user', 'bom'];
DEFINE FIELD field_code ON TABLE field_definition TYPE string;
DEFINE FIELD field_label ON TABLE field_definition TYPE string;
DEFINE FIELD description ON TABLE field_definition TYPE option<string>;
DEFINE FIELD display_order ON TABLE field_definition TYPE int;
DEFINE FIELD field_kind ON TABLE field_definition TYPE string \
    ASSERT $value IN ['text', 'textarea', 'number', 'email', 'url', \
    'phone', 'date', 'datetime', 'select', 'multiselect', 'boolean', \
    'file'];
DEFINE FIELD is_required ON TABLE field_definition TYPE bool \
    DEFAULT false;
DEFINE FIELD is_active ON TABLE field_definition TYPE bool \
    DEFAULT true;
DEFINE FIELD default_value ON TABLE field_definition TYPE any;
DEFINE FIELD validation_rules ON TABLE field_definition \
    TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD options ON TABLE field_definition TYPE option<array>;
DEFINE FIELD options.* ON TABLE field_definition TYPE object FLEXIBLE;
DEFINE FIELD ui_config ON TABLE field_definition \
    TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE field_definition TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE field_definition TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_field_def_code ON TABLE field_definition \
    COLUMNS tenant_id, entity_type, field_code UNIQUE;
DEFINE INDEX idx_field_def_scope ON TABLE field_definition \
    COLUMNS tenant_id, entity_type;

-- =======================================================================
-- Field values (tenant scope, entity-attribute-value rows)
-- =======================================================================
DEFINE TABLE field_value SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE field_value TYPE string;
DEFINE FIELD field_id ON TABLE field_value TYPE string;
DEFINE FIELD entity_type ON TABLE field_value TYPE string \
    ASSERT $value IN ['material', 'work_order', 'project', 'ncr', \
    'machine', 'department', 'plant', 'organization', 'maintenance', \
    'production_log', 'quality', 'shift', 'lane', 'user', 'bom'];
DEFINE FIELD entity_id ON TABLE field_value TYPE string;
DEFINE FIELD value ON TABLE field_value TYPE any;
DEFINE FIELD created_at ON TABLE field_value TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE field_value TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_field_value_tuple ON TABLE field_value \
    COLUMNS tenant_id, field_id, entity_type, entity_id UNIQUE;
DEFINE INDEX idx_field_value_entity ON TABLE field_value \
    COLUMNS tenant_id, entity_type, entity_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
