//! EKS cluster lookups and managed node group provisioning

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use aws_sdk_eks::types::{LaunchTemplateSpecification, NodegroupScalingConfig, NodegroupStatus};
use tracing::{debug, info, warn};

use crate::aws::context::AwsContext;
use crate::resolver::ResolvedLaunchTemplate;

/// Inputs for creating a managed node group, beyond the launch template
#[derive(Debug, Clone)]
pub struct NodeGroupRequest {
    /// EKS cluster the node group joins
    pub cluster_name: String,
    /// Node group name
    pub node_group_name: String,
    /// IAM role ARN assumed by the nodes
    pub node_role_arn: String,
    /// Subnets the nodes launch into
    pub subnet_ids: Vec<String>,
    /// Desired node count
    pub desired_size: i32,
    /// Minimum node count
    pub min_size: i32,
    /// Maximum node count
    pub max_size: i32,
    /// Tags applied to the node group resource
    pub tags: BTreeMap<String, String>,
}

/// EKS client for cluster lookups and node group provisioning
pub struct EksClient {
    client: aws_sdk_eks::Client,
}

impl EksClient {
    /// Create a new EKS client (loads AWS config from environment)
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create an EKS client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.eks_client(),
        }
    }

    /// Look up the cluster's shared security group id.
    ///
    /// Returns None when the cluster has no shared security group (rare, but
    /// possible for older clusters); the caller decides what that means.
    pub async fn cluster_security_group_id(&self, cluster_name: &str) -> Result<Option<String>> {
        debug!(cluster = %cluster_name, "Looking up cluster security group");

        let response = self
            .client
            .describe_cluster()
            .name(cluster_name)
            .send()
            .await
            .with_context(|| format!("Failed to describe cluster {}", cluster_name))?;

        let group_id = response
            .cluster()
            .and_then(|cluster| cluster.resources_vpc_config())
            .and_then(|vpc| vpc.cluster_security_group_id())
            .map(|id| id.to_string());

        debug!(cluster = %cluster_name, security_group = ?group_id, "Cluster security group lookup complete");
        Ok(group_id)
    }

    /// Create a managed node group from a resolved launch template.
    pub async fn create_node_group(
        &self,
        request: &NodeGroupRequest,
        template: &ResolvedLaunchTemplate,
    ) -> Result<()> {
        info!(
            cluster = %request.cluster_name,
            node_group = %request.node_group_name,
            template_id = %template.id,
            template_version = %template.version,
            "Creating managed node group"
        );

        self.client
            .create_nodegroup()
            .cluster_name(&request.cluster_name)
            .nodegroup_name(&request.node_group_name)
            .node_role(&request.node_role_arn)
            .set_subnets(Some(request.subnet_ids.clone()))
            .scaling_config(
                NodegroupScalingConfig::builder()
                    .desired_size(request.desired_size)
                    .min_size(request.min_size)
                    .max_size(request.max_size)
                    .build(),
            )
            .launch_template(
                LaunchTemplateSpecification::builder()
                    .id(&template.id)
                    .version(&template.version)
                    .build(),
            )
            .set_tags(Some(request.tags.clone().into_iter().collect()))
            .send()
            .await
            .context("Failed to create node group")?;

        info!(node_group = %request.node_group_name, "Node group creation started");
        Ok(())
    }

    /// Default timeout for waiting for a node group to be active (30 minutes)
    const DEFAULT_ACTIVE_TIMEOUT_SECS: u64 = 1800;

    /// Wait for a node group to reach ACTIVE.
    pub async fn wait_for_active(
        &self,
        cluster_name: &str,
        node_group_name: &str,
        timeout_secs: Option<u64>,
    ) -> Result<()> {
        let timeout =
            Duration::from_secs(timeout_secs.unwrap_or(Self::DEFAULT_ACTIVE_TIMEOUT_SECS));
        info!(
            cluster = %cluster_name,
            node_group = %node_group_name,
            timeout_secs = timeout.as_secs(),
            "Waiting for node group to be active"
        );

        let result = tokio::time::timeout(
            timeout,
            self.wait_for_active_inner(cluster_name, node_group_name),
        )
        .await;

        match result {
            Ok(inner_result) => inner_result,
            Err(_) => {
                warn!(
                    node_group = %node_group_name,
                    timeout_secs = timeout.as_secs(),
                    "Timed out waiting for node group to be active"
                );
                bail!(
                    "Timeout waiting for node group {} to be active after {}s",
                    node_group_name,
                    timeout.as_secs()
                )
            }
        }
    }

    /// Inner wait loop without timeout, polling with exponential backoff
    /// (5-30s). The outer `wait_for_active` wraps this in
    /// `tokio::time::timeout`.
    async fn wait_for_active_inner(&self, cluster_name: &str, node_group_name: &str) -> Result<()> {
        let mut delay = Duration::from_secs(5);

        loop {
            let response = self
                .client
                .describe_nodegroup()
                .cluster_name(cluster_name)
                .nodegroup_name(node_group_name)
                .send()
                .await
                .context("Failed to describe node group")?;

            let node_group = response.nodegroup();
            let status = node_group.and_then(|ng| ng.status()).cloned();

            match status {
                Some(NodegroupStatus::Active) => {
                    info!(node_group = %node_group_name, "Node group is active");
                    return Ok(());
                }
                Some(NodegroupStatus::Creating) | Some(NodegroupStatus::Updating) | None => {
                    debug!(node_group = %node_group_name, status = ?status, "Node group not active yet");
                }
                Some(other) => {
                    let issues = node_group
                        .and_then(|ng| ng.health())
                        .map(|health| format!("{:?}", health.issues()))
                        .unwrap_or_else(|| "no health detail provided".to_string());
                    bail!(
                        "Node group {} entered unexpected state {:?}: {}",
                        node_group_name,
                        other,
                        issues
                    );
                }
            }

            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(Duration::from_secs(30));
        }
    }
}
