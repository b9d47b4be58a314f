//! Default configuration values shared across nodekit components
//!
//! These constants keep the CLI, the spec file defaults, and the tests in
//! agreement about what an unspecified field means.

/// Default instance metadata hop limit.
///
/// A limit of 2 lets containerized workloads reach the metadata service
/// through the extra network hop a container runtime adds.
pub const DEFAULT_METADATA_HOP_LIMIT: i32 = 2;

/// Resource types that receive the shared tag map when instances launch
/// from a generated template
pub const DEFAULT_TAG_RESOURCE_TYPES: &[&str] = &["instance", "volume", "network-interface"];

// Serde default functions for struct field defaults

/// Returns true; for flags that default to on
pub fn default_true() -> bool {
    true
}

/// Returns the default metadata hop limit
pub fn default_hop_limit() -> i32 {
    DEFAULT_METADATA_HOP_LIMIT
}

/// Returns the default tag resource types
pub fn default_tag_resource_types() -> Vec<String> {
    DEFAULT_TAG_RESOURCE_TYPES
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}
