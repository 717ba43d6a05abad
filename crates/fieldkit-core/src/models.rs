//! Domain models for FieldKit.
//!
//! These are the core types shared across all crates: the
//! admin-authored field definitions and the per-entity stored values.

pub mod definition;
pub mod value;
