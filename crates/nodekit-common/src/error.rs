//! Typed configuration errors
//!
//! Everything here is detected before any AWS call is made. None of these
//! are retryable: the input has to change for the evaluation to succeed.

use thiserror::Error;

/// Configuration errors for a node group evaluation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A userdata customization field is not available on the selected OS
    #[error("{field} is not supported when the node OS is {os}")]
    UnsupportedUserdataField {
        /// Name of the offending input field
        field: &'static str,
        /// Title-cased OS family name
        os: &'static str,
    },

    /// `after_cluster_joining_userdata` was set without a custom AMI
    #[error("{field} requires a custom ami_id to be set")]
    CustomAmiRequired {
        /// Name of the offending input field
        field: &'static str,
    },

    /// OS value outside the supported families
    #[error("unknown OS kind '{value}' (expected AL2, AL2023, BOTTLEROCKET, or WINDOWS)")]
    UnknownOsKind {
        /// The rejected input value
        value: String,
    },

    /// More than one existing launch template id supplied
    #[error("expected at most one launch template id, got {count}")]
    AmbiguousTemplateSource {
        /// How many ids were supplied
        count: usize,
    },
}
