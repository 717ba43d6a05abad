//! Field value domain model.
//!
//! Values are stored entity-attribute-value style: one row per
//! (tenant, field, entity type, entity instance) tuple, untyped at the
//! storage layer. The engine is the single source of type truth:
//! every value is validated against its definition at write time and
//! carried as a tagged [`AttrValue`] rather than raw JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::definition::EntityType;

/// A custom-field value: a scalar or a flat array of scalars.
///
/// Objects and nested arrays are rejected at the boundary — see
/// [`AttrValue::from_json`]. Numbers keep their JSON representation so
/// an integer written as `30` reads back as `30`, not `30.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Many(Vec<AttrValue>),
}

/// The candidate value was not a scalar or a flat array of scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("must be a scalar or an array of scalars")]
pub struct UnsupportedValue;

impl AttrValue {
    /// Convert a raw JSON value into the engine's tagged shape.
    /// `Null` maps to `None`; objects and nested arrays are rejected.
    pub fn from_json(value: serde_json::Value) -> Result<Option<AttrValue>, UnsupportedValue> {
        match value {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::Bool(b) => Ok(Some(AttrValue::Bool(b))),
            serde_json::Value::Number(n) => Ok(Some(AttrValue::Number(n))),
            serde_json::Value::String(s) => Ok(Some(AttrValue::Text(s))),
            serde_json::Value::Array(items) => {
                let mut scalars = Vec::with_capacity(items.len());
                for item in items {
                    match AttrValue::from_json(item)? {
                        Some(v @ (AttrValue::Bool(_) | AttrValue::Number(_) | AttrValue::Text(_))) => {
                            scalars.push(v);
                        }
                        _ => return Err(UnsupportedValue),
                    }
                }
                Ok(Some(AttrValue::Many(scalars)))
            }
            serde_json::Value::Object(_) => Err(UnsupportedValue),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttrValue::Bool(b) => serde_json::Value::Bool(*b),
            AttrValue::Number(n) => serde_json::Value::Number(n.clone()),
            AttrValue::Text(s) => serde_json::Value::String(s.clone()),
            AttrValue::Many(items) => {
                serde_json::Value::Array(items.iter().map(AttrValue::to_json).collect())
            }
        }
    }

    /// Empty string and empty array count as "no value" for the
    /// required-vs-optional short-circuit.
    pub fn is_empty(&self) -> bool {
        match self {
            AttrValue::Text(s) => s.is_empty(),
            AttrValue::Many(items) => items.is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view with coercion: numbers pass through, numeric
    /// strings parse. Anything else (including NaN) is `None`.
    pub fn as_number_lenient(&self) -> Option<f64> {
        let n = match self {
            AttrValue::Number(n) => n.as_f64()?,
            AttrValue::Text(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        n.is_finite().then_some(n)
    }
}

/// One stored custom-attribute value for one entity instance.
///
/// At most one row exists per (tenant, field, entity type, entity id)
/// tuple; writes are upserts with last-write-wins semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldValue {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub field_id: Uuid,
    pub entity_type: EntityType,
    /// Opaque external identity of the entity instance.
    pub entity_id: String,
    /// `None` is a stored null: an explicit clear that suppresses the
    /// definition's default.
    pub value: Option<AttrValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Write request for one value tuple.
#[derive(Debug, Clone)]
pub struct UpsertFieldValue {
    pub tenant_id: Uuid,
    pub field_id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub value: Option<AttrValue>,
}

/// A definition joined with its stored value or resolved default, as
/// consumed by the rendering collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveField {
    pub definition: crate::models::definition::FieldDefinition,
    pub effective_value: Option<AttrValue>,
}
