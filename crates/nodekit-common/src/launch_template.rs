//! Launch template configuration and source decision
//!
//! [`LaunchTemplateConfig`] is the fully resolved, pure-data record handed to
//! a template provisioner. [`TemplateSource`] is the outcome of the
//! generate-vs-fetch decision for one evaluation: exactly one delegate may
//! run when the module is enabled, none when it is disabled.

use std::collections::BTreeMap;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::node_group::{CpuOptionsSpec, EbsSpec, NodeGroupSpec, PlacementSpec};
use crate::security_groups::merge_security_groups;

/// Metadata endpoint state when the endpoint is exposed
pub const HTTP_ENDPOINT_ENABLED: &str = "enabled";
/// Metadata endpoint state when the endpoint is off
pub const HTTP_ENDPOINT_DISABLED: &str = "disabled";
/// Token state when IMDSv2 is mandatory
pub const HTTP_TOKENS_REQUIRED: &str = "required";
/// Token state when IMDSv1 fallback is allowed
pub const HTTP_TOKENS_OPTIONAL: &str = "optional";

/// Instance metadata options as the launch template schema encodes them.
///
/// The endpoint state and token requirement are both always present: the hop
/// limit only takes effect when the endpoint state is explicitly set, so
/// leaving `http_endpoint` implicit would silently disable it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataOptions {
    /// "enabled" or "disabled"
    pub http_endpoint: String,
    /// How many network hops a metadata response may traverse
    pub http_put_response_hop_limit: i32,
    /// "required" or "optional"
    pub http_tokens: String,
}

/// One block device entry of the template, keyed by device name in
/// [`LaunchTemplateConfig::block_device_mappings`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDevice {
    /// Suppress a device the AMI would otherwise map
    pub no_device: bool,
    /// Instance store virtual device name
    pub virtual_name: Option<String>,
    /// EBS settings; absent entirely for non-EBS devices
    pub ebs: Option<EbsSpec>,
}

/// Nitro Enclave options; present on the template only when the feature is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclaveOptions {
    /// Always true; presence of the block is what enables the feature
    pub enabled: bool,
}

/// Detailed monitoring flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monitoring {
    /// Detailed CloudWatch monitoring for launched instances
    pub enabled: bool,
}

/// The immutable, fully resolved launch template record.
///
/// This is pure data derived from a [`NodeGroupSpec`]: identical inputs
/// produce an identical record, and any field change reads as a different
/// template to the orchestration layer, which creates the replacement before
/// destroying the original. It never embeds live resource handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchTemplateConfig {
    /// Launch EBS-optimized instances
    pub ebs_optimized: bool,
    /// Block device mappings keyed by device name
    pub block_device_mappings: BTreeMap<String, BlockDevice>,
    /// AMI id; absent when the node group uses the EKS-optimized default
    pub image_id: Option<String>,
    /// SSH key pair name
    pub key_name: Option<String>,
    /// Resource types that receive `tags` at launch, one specification each
    pub tag_specifications: Vec<String>,
    /// Instance metadata service options
    pub metadata_options: MetadataOptions,
    /// Sorted, de-duplicated security group ids
    pub security_group_ids: Vec<String>,
    /// Base64 bootstrap payload
    pub user_data: Option<String>,
    /// Tag map shared by the template and every tag specification
    pub tags: BTreeMap<String, String>,
    /// CPU topology overrides
    pub cpu_options: Option<CpuOptionsSpec>,
    /// Placement constraints
    pub placement: Option<PlacementSpec>,
    /// Enclave options; present only when enclaves are enabled
    pub enclave_options: Option<EnclaveOptions>,
    /// Detailed monitoring
    pub monitoring: Monitoring,
}

impl LaunchTemplateConfig {
    /// Assemble the template record from a node group spec and the merged
    /// security groups.
    ///
    /// Performs no validation; callers run the userdata compatibility check
    /// first so an unsupported combination never gets this far.
    pub fn from_node_group(spec: &NodeGroupSpec, security_group_ids: Vec<String>) -> Self {
        let metadata_options = MetadataOptions {
            http_endpoint: if spec.metadata.http_endpoint_enabled {
                HTTP_ENDPOINT_ENABLED
            } else {
                HTTP_ENDPOINT_DISABLED
            }
            .to_string(),
            http_put_response_hop_limit: spec.metadata.http_put_response_hop_limit,
            http_tokens: if spec.metadata.http_tokens_required {
                HTTP_TOKENS_REQUIRED
            } else {
                HTTP_TOKENS_OPTIONAL
            }
            .to_string(),
        };

        let block_device_mappings = spec
            .block_device_mappings
            .iter()
            .map(|device| {
                (
                    device.device_name.clone(),
                    BlockDevice {
                        no_device: device.no_device,
                        virtual_name: device.virtual_name.clone(),
                        ebs: device.ebs.clone(),
                    },
                )
            })
            .collect();

        Self {
            ebs_optimized: spec.ebs_optimized,
            block_device_mappings,
            image_id: spec.ami_id.clone(),
            key_name: spec.key_name.clone(),
            tag_specifications: spec.tag_resource_types.clone(),
            metadata_options,
            security_group_ids,
            user_data: spec.userdata.as_deref().map(encode_user_data),
            tags: spec.tags.clone(),
            cpu_options: spec.cpu_options,
            placement: spec.placement.clone(),
            enclave_options: spec.enclave_enabled.then_some(EnclaveOptions { enabled: true }),
            monitoring: Monitoring {
                enabled: spec.monitoring_enabled,
            },
        }
    }
}

fn encode_user_data(raw: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(raw.as_bytes())
}

/// Outcome of the generate-vs-fetch decision for one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplateSource {
    /// Module disabled; nothing is resolved and no delegate runs
    Disabled,
    /// Use an existing template
    Fetch {
        /// Launch template id supplied by the user
        id: String,
        /// Explicit version to pin, if any
        version: Option<String>,
    },
    /// Generate a template from the assembled config
    Generate {
        /// The fully assembled template record
        config: Box<LaunchTemplateConfig>,
        /// Explicit version to pin, if any
        version: Option<String>,
    },
}

impl TemplateSource {
    /// Decide the template source for a node group evaluation.
    ///
    /// Userdata compatibility is checked before anything is assembled, so an
    /// invalid combination never reaches a delegate. Supplying more than one
    /// template id is rejected rather than silently falling back to
    /// generation.
    pub fn for_node_group(
        spec: &NodeGroupSpec,
        cluster_security_group_id: Option<&str>,
        ssh_access_security_group_id: Option<&str>,
    ) -> Result<Self, ConfigError> {
        if !spec.enabled {
            return Ok(TemplateSource::Disabled);
        }

        spec.validate_userdata()?;

        match spec.launch_template_ids.as_slice() {
            [] => {
                let merged = merge_security_groups(
                    spec.associate_cluster_security_group,
                    cluster_security_group_id,
                    ssh_access_security_group_id,
                    &spec.associated_security_group_ids,
                );
                Ok(TemplateSource::Generate {
                    config: Box::new(LaunchTemplateConfig::from_node_group(spec, merged)),
                    version: spec.launch_template_version.clone(),
                })
            }
            [id] => Ok(TemplateSource::Fetch {
                id: id.clone(),
                version: spec.launch_template_version.clone(),
            }),
            more => Err(ConfigError::AmbiguousTemplateSource { count: more.len() }),
        }
    }
}
