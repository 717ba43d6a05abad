//! Router assembly.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use surrealdb::Connection;

use crate::handlers;
use crate::state::AppState;

pub fn build_router<C: Connection>(state: Arc<AppState<C>>) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/custom-fields",
            get(handlers::list_fields).post(handlers::create_field),
        )
        .route("/custom-fields/reorder", post(handlers::reorder_fields))
        .route(
            "/custom-fields/entity/:entity_type",
            get(handlers::list_fields_for_entity),
        )
        .route("/custom-fields/values/bulk", post(handlers::set_values_bulk))
        .route(
            "/custom-fields/values/:entity_type",
            post(handlers::set_value),
        )
        .route(
            "/custom-fields/values/:entity_type/:entity_id",
            get(handlers::list_values),
        )
        .route(
            "/custom-fields/values/:entity_type/:entity_id/effective",
            get(handlers::list_effective_values),
        )
        .route(
            "/custom-fields/:id",
            get(handlers::get_field)
                .put(handlers::update_field)
                .delete(handlers::delete_field),
        )
        .with_state(state)
}
