//! FieldKit Core — domain models, repository traits, and the
//! type-dispatching validation engine for custom fields.
//!
//! This crate is pure domain logic: no storage, no transport. The
//! `fieldkit-db` crate implements the repository traits against
//! SurrealDB and the `fieldkit-engine` crate layers the registry and
//! bulk-write coordination on top.

pub mod error;
pub mod models;
pub mod repository;
pub mod validate;

pub use error::{FieldkitError, FieldkitResult};
