//! Request handlers for the custom-field REST surface.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use fieldkit_core::FieldkitError;
use fieldkit_core::models::definition::{
    CreateFieldDefinition, EntityType, FieldKind, FieldOption, FieldOrder, UpdateFieldDefinition,
    ValidationRules,
};
use fieldkit_core::models::value::AttrValue;
use fieldkit_core::repository::Pagination;
use serde::{Deserialize, Serialize};
use surrealdb::Connection;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Tenant context stand-in: the surrounding platform resolves the
/// tenant and forwards it in this header.
const TENANT_HEADER: &str = "x-tenant-id";

fn tenant_id(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    headers
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or(ApiError(FieldkitError::TenantContext))
}

// -----------------------------------------------------------------------
// Request/response bodies
// -----------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PageBody<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Deserialize)]
pub struct CustomFieldCreate {
    pub entity_type: EntityType,
    pub field_code: String,
    pub field_label: String,
    pub description: Option<String>,
    pub display_order: Option<i64>,
    pub field_kind: FieldKind,
    #[serde(default)]
    pub is_required: bool,
    pub default_value: Option<serde_json::Value>,
    #[serde(default)]
    pub validation_rules: ValidationRules,
    pub options: Option<Vec<FieldOption>>,
    pub ui_config: Option<serde_json::Value>,
}

/// Update body. `field_code`/`field_kind` may be echoed unchanged;
/// differing values are rejected as immutable. A JSON `null` (or an
/// absent key) means "no change" for every field here.
#[derive(Debug, Deserialize)]
pub struct CustomFieldUpdate {
    pub field_code: Option<String>,
    pub field_kind: Option<FieldKind>,
    pub field_label: Option<String>,
    pub description: Option<String>,
    pub display_order: Option<i64>,
    pub is_required: Option<bool>,
    pub is_active: Option<bool>,
    pub default_value: Option<serde_json::Value>,
    pub validation_rules: Option<ValidationRules>,
    pub options: Option<Vec<FieldOption>>,
    pub ui_config: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub entity_type: EntityType,
    pub field_orders: Vec<FieldOrder>,
}

#[derive(Debug, Deserialize)]
pub struct SetValueRequest {
    pub entity_id: String,
    pub field_code: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct BulkSetRequest {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub values: BTreeMap<String, serde_json::Value>,
}

fn parse_default_value(
    raw: Option<serde_json::Value>,
) -> Result<Option<AttrValue>, ApiError> {
    match raw {
        None => Ok(None),
        Some(value) => AttrValue::from_json(value).map_err(|e| {
            ApiError(FieldkitError::InvalidDefinition(format!(
                "default_value {e}"
            )))
        }),
    }
}

// -----------------------------------------------------------------------
// Health
// -----------------------------------------------------------------------

pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// -----------------------------------------------------------------------
// Definitions
// -----------------------------------------------------------------------

pub async fn list_fields<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    headers: HeaderMap,
    Query(page): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = tenant_id(&headers)?;
    let defaults = Pagination::default();
    let result = state
        .registry
        .list(
            tenant,
            Pagination {
                offset: page.offset.unwrap_or(defaults.offset),
                limit: page.limit.unwrap_or(defaults.limit),
            },
        )
        .await?;
    Ok(Json(PageBody {
        items: result.items,
        total: result.total,
        offset: result.offset,
        limit: result.limit,
    }))
}

pub async fn list_fields_for_entity<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    headers: HeaderMap,
    Path(entity_type): Path<EntityType>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = tenant_id(&headers)?;
    let fields = state
        .registry
        .list_for_entity(tenant, entity_type, false)
        .await?;
    Ok(Json(fields))
}

pub async fn get_field<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = tenant_id(&headers)?;
    let field = state.registry.get(tenant, id).await?;
    Ok(Json(field))
}

pub async fn create_field<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    headers: HeaderMap,
    Json(body): Json<CustomFieldCreate>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = tenant_id(&headers)?;
    let default_value = parse_default_value(body.default_value)?;
    let created = state
        .registry
        .create(CreateFieldDefinition {
            tenant_id: tenant,
            entity_type: body.entity_type,
            field_code: body.field_code,
            field_label: body.field_label,
            description: body.description,
            display_order: body.display_order,
            field_kind: body.field_kind,
            is_required: body.is_required,
            default_value,
            validation_rules: body.validation_rules,
            options: body.options,
            ui_config: body.ui_config,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_field<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<CustomFieldUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = tenant_id(&headers)?;
    let default_value = parse_default_value(body.default_value)?.map(Some);
    let updated = state
        .registry
        .update(
            tenant,
            id,
            UpdateFieldDefinition {
                field_code: body.field_code,
                field_kind: body.field_kind,
                field_label: body.field_label,
                description: body.description.map(Some),
                display_order: body.display_order,
                is_required: body.is_required,
                is_active: body.is_active,
                default_value,
                validation_rules: body.validation_rules,
                options: body.options,
                ui_config: body.ui_config,
            },
        )
        .await?;
    Ok(Json(updated))
}

pub async fn delete_field<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = tenant_id(&headers)?;
    state.registry.soft_delete(tenant, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reorder_fields<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    headers: HeaderMap,
    Json(body): Json<ReorderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = tenant_id(&headers)?;
    state
        .registry
        .reorder(tenant, body.entity_type, body.field_orders)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// -----------------------------------------------------------------------
// Values
// -----------------------------------------------------------------------

pub async fn list_values<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    headers: HeaderMap,
    Path((entity_type, entity_id)): Path<(EntityType, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = tenant_id(&headers)?;
    let values = state.values.values(tenant, entity_type, &entity_id).await?;
    Ok(Json(values))
}

pub async fn list_effective_values<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    headers: HeaderMap,
    Path((entity_type, entity_id)): Path<(EntityType, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = tenant_id(&headers)?;
    let fields = state
        .values
        .values_with_definitions(tenant, entity_type, &entity_id)
        .await?;
    Ok(Json(fields))
}

pub async fn set_value<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    headers: HeaderMap,
    Path(entity_type): Path<EntityType>,
    Json(body): Json<SetValueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = tenant_id(&headers)?;
    let stored = state
        .values
        .set_one(
            tenant,
            entity_type,
            &body.entity_id,
            &body.field_code,
            body.value,
        )
        .await?;
    Ok(Json(stored))
}

pub async fn set_values_bulk<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    headers: HeaderMap,
    Json(body): Json<BulkSetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = tenant_id(&headers)?;
    let stored = state
        .values
        .set_many(tenant, body.entity_type, &body.entity_id, body.values)
        .await?;
    Ok(Json(stored))
}
