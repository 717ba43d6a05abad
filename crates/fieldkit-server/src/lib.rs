//! FieldKit Server — the REST surface over the custom-field engine.
//!
//! Tenant resolution is owned by an external collaborator; the
//! `x-tenant-id` header stands in for it here. The rendering
//! collaborator consumes the `{definition, effective_value}` feed and
//! only ever displays the engine's error messages — it never
//! validates on its own.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
