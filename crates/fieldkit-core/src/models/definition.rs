//! Field definition domain model.
//!
//! A field definition is the admin-authored metadata describing one
//! custom attribute of a business entity type: its machine name, kind,
//! validation rules, and presentation hints. Definitions are
//! tenant-scoped and never hard-deleted; retiring one sets
//! `is_active = false` so already-stored values stay referenceable.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::value::AttrValue;

/// Closed enumeration of business entity categories that can carry
/// custom fields. Entity identity itself is owned by external systems;
/// this enum only scopes definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Material,
    WorkOrder,
    Project,
    Ncr,
    Machine,
    Department,
    Plant,
    Organization,
    Maintenance,
    ProductionLog,
    Quality,
    Shift,
    Lane,
    User,
    Bom,
}

impl EntityType {
    pub const ALL: [EntityType; 15] = [
        EntityType::Material,
        EntityType::WorkOrder,
        EntityType::Project,
        EntityType::Ncr,
        EntityType::Machine,
        EntityType::Department,
        EntityType::Plant,
        EntityType::Organization,
        EntityType::Maintenance,
        EntityType::ProductionLog,
        EntityType::Quality,
        EntityType::Shift,
        EntityType::Lane,
        EntityType::User,
        EntityType::Bom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Material => "material",
            EntityType::WorkOrder => "work_order",
            EntityType::Project => "project",
            EntityType::Ncr => "ncr",
            EntityType::Machine => "machine",
            EntityType::Department => "department",
            EntityType::Plant => "plant",
            EntityType::Organization => "organization",
            EntityType::Maintenance => "maintenance",
            EntityType::ProductionLog => "production_log",
            EntityType::Quality => "quality",
            EntityType::Shift => "shift",
            EntityType::Lane => "lane",
            EntityType::User => "user",
            EntityType::Bom => "bom",
        }
    }

    pub fn parse(s: &str) -> Option<EntityType> {
        EntityType::ALL.iter().copied().find(|e| e.as_str() == s)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The twelve field kinds understood by the validation engine.
///
/// The kind of a definition is immutable after creation: values
/// already stored against it conform to the original kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Email,
    Url,
    Phone,
    Date,
    Datetime,
    Select,
    Multiselect,
    Boolean,
    File,
}

impl FieldKind {
    pub const ALL: [FieldKind; 12] = [
        FieldKind::Text,
        FieldKind::Textarea,
        FieldKind::Number,
        FieldKind::Email,
        FieldKind::Url,
        FieldKind::Phone,
        FieldKind::Date,
        FieldKind::Datetime,
        FieldKind::Select,
        FieldKind::Multiselect,
        FieldKind::Boolean,
        FieldKind::File,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Number => "number",
            FieldKind::Email => "email",
            FieldKind::Url => "url",
            FieldKind::Phone => "phone",
            FieldKind::Date => "date",
            FieldKind::Datetime => "datetime",
            FieldKind::Select => "select",
            FieldKind::Multiselect => "multiselect",
            FieldKind::Boolean => "boolean",
            FieldKind::File => "file",
        }
    }

    pub fn parse(s: &str) -> Option<FieldKind> {
        FieldKind::ALL.iter().copied().find(|k| k.as_str() == s)
    }

    /// Kinds that require a non-empty `options` list.
    pub fn requires_options(&self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::Multiselect)
    }

    /// Kinds whose values are free-form strings, subject to the
    /// length/pattern rules.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            FieldKind::Text
                | FieldKind::Textarea
                | FieldKind::Email
                | FieldKind::Url
                | FieldKind::Phone
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One selectable choice of a select/multiselect field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    /// Stored value, compared by strict string equality.
    pub value: String,
    /// Display label shown by the rendering collaborator.
    pub label: String,
    /// Disabled options stay listed but cannot be newly chosen.
    #[serde(default)]
    pub disabled: bool,
}

/// Inclusive calendar bounds for date/datetime fields (ISO dates).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub min: Option<NaiveDate>,
    pub max: Option<NaiveDate>,
}

/// Kind-specific validation configuration.
///
/// The struct is flat; which fields are allowed to be set depends on
/// the owning definition's kind and is enforced by the registry (see
/// [`crate::validate::check_rules`]), not by this type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    /// Regular expression, search semantics (a match anywhere passes).
    pub pattern: Option<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub date_range: Option<DateRange>,
    /// Advisory metadata for the external upload collaborator; the
    /// engine never enforces it.
    pub allowed_file_types: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub entity_type: EntityType,
    /// Machine name, unique per (tenant, entity type) among active and
    /// inactive definitions. Immutable after creation.
    pub field_code: String,
    /// Display name.
    pub field_label: String,
    pub description: Option<String>,
    /// Render/list position; distinct per (tenant, entity type) after
    /// any reorder, ties broken by `id` ascending.
    pub display_order: i64,
    /// Immutable after creation.
    pub field_kind: FieldKind,
    pub is_required: bool,
    /// Soft-delete flag. Inactive definitions are hidden from
    /// new-entry forms but their stored values remain queryable.
    pub is_active: bool,
    /// Raw default, interpreted per kind when an effective value is
    /// requested and nothing is stored.
    pub default_value: Option<AttrValue>,
    pub validation_rules: ValidationRules,
    /// Present and non-empty iff `field_kind` is select/multiselect.
    pub options: Option<Vec<FieldOption>>,
    /// Opaque hints for the rendering collaborator.
    pub ui_config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FieldDefinition {
    /// The option values a select/multiselect value must come from.
    pub fn option_values(&self) -> impl Iterator<Item = &str> {
        self.options
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|o| o.value.as_str())
    }
}

/// Fields required to create a new definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFieldDefinition {
    pub tenant_id: Uuid,
    pub entity_type: EntityType,
    pub field_code: String,
    pub field_label: String,
    pub description: Option<String>,
    /// `None` appends after the scope's current maximum.
    pub display_order: Option<i64>,
    pub field_kind: FieldKind,
    #[serde(default)]
    pub is_required: bool,
    pub default_value: Option<AttrValue>,
    #[serde(default)]
    pub validation_rules: ValidationRules,
    pub options: Option<Vec<FieldOption>>,
    pub ui_config: Option<serde_json::Value>,
}

/// Fields that can be updated on an existing definition.
///
/// `field_code` and `field_kind` are accepted so that a client echoing
/// the stored values can be told apart from one attempting a mutation;
/// a differing value is rejected with `ImmutableField`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFieldDefinition {
    pub field_code: Option<String>,
    pub field_kind: Option<FieldKind>,
    pub field_label: Option<String>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub description: Option<Option<String>>,
    pub display_order: Option<i64>,
    pub is_required: Option<bool>,
    pub is_active: Option<bool>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub default_value: Option<Option<AttrValue>>,
    pub validation_rules: Option<ValidationRules>,
    pub options: Option<Vec<FieldOption>>,
    pub ui_config: Option<serde_json::Value>,
}

/// The mutable subset of a definition, as applied by the storage
/// layer. Produced by the registry after the immutability and
/// consistency checks have passed; `field_code`/`field_kind` are
/// structurally absent.
#[derive(Debug, Clone, Default)]
pub struct DefinitionChanges {
    pub field_label: Option<String>,
    pub description: Option<Option<String>>,
    pub display_order: Option<i64>,
    pub is_required: Option<bool>,
    pub is_active: Option<bool>,
    pub default_value: Option<Option<AttrValue>>,
    pub validation_rules: Option<ValidationRules>,
    pub options: Option<Vec<FieldOption>>,
    pub ui_config: Option<serde_json::Value>,
}

/// One entry of a batch reorder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FieldOrder {
    pub field_id: Uuid,
    pub display_order: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_round_trips_through_strings() {
        for entity in EntityType::ALL {
            assert_eq!(EntityType::parse(entity.as_str()), Some(entity));
        }
        assert_eq!(EntityType::parse("warehouse"), None);
    }

    #[test]
    fn field_kind_round_trips_through_strings() {
        for kind in FieldKind::ALL {
            assert_eq!(FieldKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(FieldKind::parse("checkbox"), None);
    }

    #[test]
    fn entity_type_serde_uses_snake_case() {
        let json = serde_json::to_string(&EntityType::WorkOrder).unwrap();
        assert_eq!(json, "\"work_order\"");
        let back: EntityType = serde_json::from_str("\"production_log\"").unwrap();
        assert_eq!(back, EntityType::ProductionLog);
    }

    #[test]
    fn option_disabled_defaults_to_false() {
        let opt: FieldOption = serde_json::from_str(r#"{"value":"A","label":"A"}"#).unwrap();
        assert!(!opt.disabled);
    }
}
