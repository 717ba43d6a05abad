//! Error-to-HTTP mapping.

use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fieldkit_core::FieldkitError;
use serde::Serialize;

/// Wrapper that maps [`FieldkitError`] onto an HTTP status and a
/// structured JSON body.
#[derive(Debug)]
pub struct ApiError(pub FieldkitError);

impl From<FieldkitError> for ApiError {
    fn from(err: FieldkitError) -> Self {
        Self(err)
    }
}

/// Structured error body: a stable machine-readable kind, the
/// human-readable message, and the per-field map for validation
/// failures.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            FieldkitError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            FieldkitError::DuplicateFieldCode { .. } => {
                (StatusCode::CONFLICT, "duplicate_field_code")
            }
            FieldkitError::ImmutableField { .. } => (StatusCode::CONFLICT, "immutable_field"),
            FieldkitError::ReorderConflict(_) => (StatusCode::CONFLICT, "reorder_conflict"),
            FieldkitError::InvalidDefinition(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_definition")
            }
            FieldkitError::InvalidOptions(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_options")
            }
            FieldkitError::InvalidRules(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_rules"),
            FieldkitError::UnknownField { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unknown_field")
            }
            FieldkitError::ValidationFailed { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed")
            }
            FieldkitError::BatchTooLarge { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "batch_too_large")
            }
            FieldkitError::TenantContext => (StatusCode::BAD_REQUEST, "tenant_context"),
            FieldkitError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let fields = match self.0 {
            FieldkitError::ValidationFailed { ref errors } => Some(errors.clone()),
            _ => None,
        };

        let body = ErrorBody {
            error: kind,
            message: self.0.to_string(),
            fields,
        };
        (status, Json(body)).into_response()
    }
}
