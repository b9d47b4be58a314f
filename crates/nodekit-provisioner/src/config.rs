//! Provisioning run configuration and spec file loading

use std::path::Path;

use anyhow::{Context, Result};
use garde::Validate;
use nodekit_common::NodeGroupSpec;

/// Scaling bounds for the node group
#[derive(Debug, Clone, Copy)]
pub struct ScalingConfig {
    /// Desired node count
    pub desired_size: i32,
    /// Minimum node count
    pub min_size: i32,
    /// Maximum node count
    pub max_size: i32,
}

/// Configuration for one provisioning run
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// AWS region
    pub region: String,
    /// EKS cluster name
    pub cluster_name: String,
    /// Node group name
    pub node_group_name: String,
    /// IAM role ARN assumed by the nodes
    pub node_role_arn: String,
    /// Subnets the nodes launch into
    pub subnet_ids: Vec<String>,
    /// Scaling bounds
    pub scaling: ScalingConfig,
    /// Block until the node group is active
    pub wait: bool,
}

/// Load and validate a node group spec from a JSON file.
///
/// Field-level constraints are checked here; the cross-field userdata/OS
/// rules run later as part of the template source decision.
pub fn load_spec(path: &Path) -> Result<NodeGroupSpec> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read spec file {}", path.display()))?;

    let spec: NodeGroupSpec = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse spec file {}", path.display()))?;

    spec.validate()
        .with_context(|| format!("Invalid spec file {}", path.display()))?;

    Ok(spec)
}
