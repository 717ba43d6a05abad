//! Engine configuration.

/// Service-level limits for the registry and the value write path.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum length of a `field_code` (default: 64).
    pub max_field_code_length: usize,
    /// Maximum length of a `field_label` (default: 255).
    pub max_field_label_length: usize,
    /// Maximum number of options on a select/multiselect field
    /// (default: 200).
    pub max_options: usize,
    /// Maximum number of fields accepted by one bulk write
    /// (default: 100).
    pub max_bulk_fields: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_field_code_length: 64,
            max_field_label_length: 255,
            max_options: 200,
            max_bulk_fields: 100,
        }
    }
}
