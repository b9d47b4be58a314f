//! Node group input model
//!
//! [`NodeGroupSpec`] is the full set of user inputs relevant to the launch
//! template, deserialized from the spec file handed to the CLI. It is
//! constructed once per evaluation and treated as immutable; everything else
//! in this crate is a pure derivation of it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::defaults::{default_hop_limit, default_tag_resource_types, default_true};
use crate::error::ConfigError;
use crate::os::OsKind;
use crate::userdata::UserdataOptions;

/// EBS settings for one block device mapping.
///
/// Every field is optional; an omitted field defers to the value baked into
/// the AMI's own mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, garde::Validate)]
#[serde(deny_unknown_fields, default)]
pub struct EbsSpec {
    /// Delete the volume when the instance terminates
    #[garde(skip)]
    pub delete_on_termination: Option<bool>,
    /// Encrypt the volume
    #[garde(skip)]
    pub encrypted: Option<bool>,
    /// Provisioned IOPS (io1/io2/gp3)
    #[garde(range(min = 100, max = 256_000))]
    pub iops: Option<i32>,
    /// KMS key for encryption
    #[garde(length(min = 1))]
    pub kms_key_id: Option<String>,
    /// Snapshot to create the volume from
    #[garde(length(min = 1))]
    pub snapshot_id: Option<String>,
    /// Throughput in MiB/s (gp3)
    #[garde(range(min = 125, max = 2_000))]
    pub throughput: Option<i32>,
    /// Volume size in GiB
    #[garde(range(min = 1, max = 65_536))]
    pub volume_size: Option<i32>,
    /// Volume type, e.g. "gp3"
    #[garde(length(min = 1))]
    pub volume_type: Option<String>,
}

/// One block device mapping request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, garde::Validate)]
#[serde(deny_unknown_fields)]
pub struct BlockDeviceSpec {
    /// Device name, e.g. "/dev/xvda"
    #[garde(length(min = 1))]
    pub device_name: String,
    /// Suppress a device the AMI would otherwise map
    #[serde(default)]
    #[garde(skip)]
    pub no_device: bool,
    /// Instance store virtual device name, e.g. "ephemeral0"
    #[serde(default)]
    #[garde(skip)]
    pub virtual_name: Option<String>,
    /// EBS settings; leave out entirely for non-EBS devices
    #[serde(default)]
    #[garde(dive)]
    pub ebs: Option<EbsSpec>,
}

/// CPU topology overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, garde::Validate)]
#[serde(deny_unknown_fields)]
pub struct CpuOptionsSpec {
    /// Number of CPU cores
    #[garde(range(min = 1))]
    pub core_count: i32,
    /// Threads per core (1 disables hyperthreading)
    #[garde(range(min = 1, max = 2))]
    pub threads_per_core: i32,
}

/// Instance placement constraints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, garde::Validate)]
#[serde(deny_unknown_fields, default)]
pub struct PlacementSpec {
    /// Affinity setting for dedicated hosts
    #[garde(skip)]
    pub affinity: Option<String>,
    /// Availability zone to pin instances to
    #[garde(skip)]
    pub availability_zone: Option<String>,
    /// Placement group name
    #[garde(skip)]
    pub group_name: Option<String>,
    /// Dedicated host id
    #[garde(skip)]
    pub host_id: Option<String>,
    /// Host resource group ARN
    #[garde(skip)]
    pub host_resource_group_arn: Option<String>,
    /// Spread domain
    #[garde(skip)]
    pub spread_domain: Option<String>,
    /// Tenancy ("default", "dedicated", "host")
    #[garde(skip)]
    pub tenancy: Option<String>,
    /// Partition number for partition placement groups
    #[garde(range(min = 1, max = 7))]
    pub partition_number: Option<i32>,
}

/// Instance metadata service settings.
///
/// Both the endpoint state and the token requirement are always carried
/// explicitly; see [`crate::launch_template`] for why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, garde::Validate)]
#[serde(deny_unknown_fields, default)]
pub struct MetadataSpec {
    /// Expose the instance metadata endpoint
    #[garde(skip)]
    pub http_endpoint_enabled: bool,
    /// How many network hops a metadata response may traverse
    #[garde(range(min = 1, max = 64))]
    pub http_put_response_hop_limit: i32,
    /// Require IMDSv2 session tokens
    #[garde(skip)]
    pub http_tokens_required: bool,
}

impl Default for MetadataSpec {
    fn default() -> Self {
        Self {
            http_endpoint_enabled: true,
            http_put_response_hop_limit: default_hop_limit(),
            http_tokens_required: true,
        }
    }
}

/// The full set of user inputs for one node group evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, garde::Validate)]
#[serde(deny_unknown_fields, default)]
pub struct NodeGroupSpec {
    /// Evaluate at all; when false nothing is resolved or created
    #[garde(skip)]
    pub enabled: bool,

    /// Existing launch template id to use instead of generating one.
    /// At most one entry; an empty list means "generate".
    #[garde(skip)]
    pub launch_template_ids: Vec<String>,
    /// Template version to pin; the latest version is used when omitted
    #[garde(length(min = 1))]
    pub launch_template_version: Option<String>,

    /// Custom AMI id; the EKS-optimized AMI for `os` is used when omitted
    #[garde(length(min = 1))]
    pub ami_id: Option<String>,
    /// Node OS family
    #[garde(skip)]
    pub os: OsKind,

    /// Block device mappings for the generated template
    #[garde(dive)]
    pub block_device_mappings: Vec<BlockDeviceSpec>,
    /// Instance metadata service settings
    #[garde(dive)]
    pub metadata: MetadataSpec,

    /// EC2 resource types that receive `tags` when instances launch
    #[garde(inner(length(min = 1)))]
    pub tag_resource_types: Vec<String>,
    /// Tags applied to the template and to launched resources
    #[garde(skip)]
    pub tags: BTreeMap<String, String>,

    /// SSH key pair name
    #[garde(length(min = 1))]
    pub key_name: Option<String>,
    /// Launch EBS-optimized instances
    #[garde(skip)]
    pub ebs_optimized: bool,
    /// CPU topology overrides
    #[garde(dive)]
    pub cpu_options: Option<CpuOptionsSpec>,
    /// Placement constraints
    #[garde(dive)]
    pub placement: Option<PlacementSpec>,
    /// Run nodes inside Nitro Enclaves
    #[garde(skip)]
    pub enclave_enabled: bool,
    /// Detailed CloudWatch monitoring
    #[garde(skip)]
    pub monitoring_enabled: bool,

    /// Rendered bootstrap payload from the userdata renderer, carried opaque
    #[garde(skip)]
    pub userdata: Option<String>,
    /// Bootstrap customization hooks, validated against `os`
    #[garde(skip)]
    pub userdata_options: UserdataOptions,

    /// Attach the cluster's shared security group
    #[garde(skip)]
    pub associate_cluster_security_group: bool,
    /// Additional security group ids to attach
    #[garde(inner(length(min = 1)))]
    pub associated_security_group_ids: Vec<String>,
}

impl Default for NodeGroupSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            launch_template_ids: Vec::new(),
            launch_template_version: None,
            ami_id: None,
            os: OsKind::default(),
            block_device_mappings: Vec::new(),
            metadata: MetadataSpec::default(),
            tag_resource_types: default_tag_resource_types(),
            tags: BTreeMap::new(),
            key_name: None,
            ebs_optimized: false,
            cpu_options: None,
            placement: None,
            enclave_enabled: false,
            monitoring_enabled: default_true(),
            userdata: None,
            userdata_options: UserdataOptions::default(),
            associate_cluster_security_group: true,
            associated_security_group_ids: Vec::new(),
        }
    }
}

impl NodeGroupSpec {
    /// Whether a custom AMI id was supplied
    pub fn has_custom_ami(&self) -> bool {
        self.ami_id.is_some()
    }

    /// Check the userdata hooks against the OS family and AMI choice
    pub fn validate_userdata(&self) -> Result<(), ConfigError> {
        self.userdata_options.validate(self.os, self.has_custom_ami())
    }
}
