//! Userdata customization options and per-OS compatibility rules
//!
//! Each bootstrap hook is only meaningful on some OS families. The rules are
//! checked up front, before any template is assembled or any AWS call is
//! made, so an unsupported combination never produces a node that boots into
//! a broken state.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::os::OsKind;

/// Bootstrap userdata customization hooks for a node group.
///
/// These feed the external userdata renderer; this type only carries them
/// and knows which OS families support which hook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct UserdataOptions {
    /// Shell commands executed before the node joins the cluster
    pub before_cluster_joining_userdata: Option<String>,
    /// Extra arguments appended to the kubelet invocation
    pub kubelet_extra_args: Option<String>,
    /// Extra arguments passed to the bootstrap script
    pub bootstrap_extra_args: Option<String>,
    /// Shell commands executed after the node joins the cluster.
    /// Only honored on custom AMIs, where the bootstrap sequence is the
    /// caller's own.
    pub after_cluster_joining_userdata: Option<String>,
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.is_empty())
}

impl UserdataOptions {
    /// Whether no customization was requested at all
    pub fn is_empty(&self) -> bool {
        !is_set(&self.before_cluster_joining_userdata)
            && !is_set(&self.kubelet_extra_args)
            && !is_set(&self.bootstrap_extra_args)
            && !is_set(&self.after_cluster_joining_userdata)
    }

    /// Check every customization field against the OS family.
    ///
    /// | Field | AL2 | AL2023 | BOTTLEROCKET | WINDOWS |
    /// |---|---|---|---|---|
    /// | `before_cluster_joining_userdata` | yes | - | - | yes |
    /// | `kubelet_extra_args` | yes | yes | - | yes |
    /// | `bootstrap_extra_args` | yes | - | - | yes |
    /// | `after_cluster_joining_userdata` | yes | - | - | yes |
    ///
    /// `after_cluster_joining_userdata` additionally requires a custom AMI
    /// id on every OS family. The first violated rule is reported, naming
    /// the field and the OS.
    pub fn validate(&self, os: OsKind, has_custom_ami: bool) -> Result<(), ConfigError> {
        use OsKind::{Al2, Al2023, Windows};

        if is_set(&self.before_cluster_joining_userdata) && !matches!(os, Al2 | Windows) {
            return Err(ConfigError::UnsupportedUserdataField {
                field: "before_cluster_joining_userdata",
                os: os.title(),
            });
        }

        if is_set(&self.kubelet_extra_args) && !matches!(os, Al2 | Al2023 | Windows) {
            return Err(ConfigError::UnsupportedUserdataField {
                field: "kubelet_extra_args",
                os: os.title(),
            });
        }

        if is_set(&self.bootstrap_extra_args) && !matches!(os, Al2 | Windows) {
            return Err(ConfigError::UnsupportedUserdataField {
                field: "bootstrap_extra_args",
                os: os.title(),
            });
        }

        if is_set(&self.after_cluster_joining_userdata) {
            if !matches!(os, Al2 | Windows) {
                return Err(ConfigError::UnsupportedUserdataField {
                    field: "after_cluster_joining_userdata",
                    os: os.title(),
                });
            }
            if !has_custom_ami {
                return Err(ConfigError::CustomAmiRequired {
                    field: "after_cluster_joining_userdata",
                });
            }
        }

        Ok(())
    }
}
