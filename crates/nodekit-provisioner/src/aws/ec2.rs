//! EC2 launch template operations

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use aws_sdk_ec2::types::{
    LaunchTemplateBlockDeviceMappingRequest, LaunchTemplateCpuOptionsRequest,
    LaunchTemplateEbsBlockDeviceRequest, LaunchTemplateEnclaveOptionsRequest,
    LaunchTemplateInstanceMetadataOptionsRequest, LaunchTemplatePlacementRequest,
    LaunchTemplateTagSpecificationRequest, LaunchTemplatesMonitoringRequest,
    RequestLaunchTemplateData, ResourceType, Tag, TagSpecification,
};
use backon::{ExponentialBuilder, Retryable};
use nodekit_common::launch_template::{BlockDevice, LaunchTemplateConfig};
use nodekit_common::node_group::PlacementSpec;
use tracing::{debug, info, warn};

use crate::aws::context::AwsContext;
use crate::aws::error::{classify_anyhow_error, ignore_not_found};
use crate::resolver::{LaunchTemplateOps, TemplateDescription};

/// EC2 client for managing launch templates
pub struct Ec2Client {
    pub(crate) client: aws_sdk_ec2::Client,
}

impl Ec2Client {
    /// Create a new EC2 client (loads AWS config from environment)
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create an EC2 client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
        }
    }

    /// Create a launch template from an assembled config.
    ///
    /// Retries on AWS rate limiting; any other failure surfaces immediately.
    pub async fn create_launch_template(
        &self,
        name: &str,
        config: &LaunchTemplateConfig,
    ) -> Result<TemplateDescription> {
        info!(template_name = %name, "Creating launch template");

        let data = request_data(config);
        let name_for_log = name.to_string();

        let response = (|| async {
            self.client
                .create_launch_template()
                .launch_template_name(name)
                .launch_template_data(data.clone())
                .tag_specifications(template_resource_tags(&config.tags))
                .send()
                .await
                .context("Failed to create launch template")
        })
        .retry(
            ExponentialBuilder::default()
                .with_min_delay(Duration::from_secs(2))
                .with_max_delay(Duration::from_secs(30))
                .with_max_times(5),
        )
        .when(|e| classify_anyhow_error(e).is_retryable())
        .notify(|e, dur| {
            warn!(
                template_name = %name_for_log,
                delay = ?dur,
                error = %e,
                "Launch template creation rate limited, backing off..."
            );
        })
        .await?;

        let template = response
            .launch_template()
            .context("No launch template in response")?;
        let id = template
            .launch_template_id()
            .context("No launch template ID in response")?
            .to_string();
        let latest_version = template.latest_version_number().unwrap_or(1);

        info!(template_id = %id, latest_version, "Launch template created");

        Ok(TemplateDescription { id, latest_version })
    }

    /// Look up an existing launch template by id
    pub async fn describe_launch_template(&self, id: &str) -> Result<TemplateDescription> {
        debug!(template_id = %id, "Describing launch template");

        let response = self
            .client
            .describe_launch_templates()
            .launch_template_ids(id)
            .send()
            .await
            .context("Failed to describe launch template")?;

        let template = response
            .launch_templates()
            .first()
            .with_context(|| format!("Launch template {} not found", id))?;

        Ok(TemplateDescription {
            id: template
                .launch_template_id()
                .context("No launch template ID in response")?
                .to_string(),
            latest_version: template.latest_version_number().unwrap_or(1),
        })
    }

    /// Delete a launch template.
    ///
    /// Returns Ok(()) if the template was deleted or never existed
    /// (idempotent for cleanup).
    pub async fn delete_launch_template(&self, id: &str) -> Result<()> {
        info!(template_id = %id, "Deleting launch template");

        let result = self
            .client
            .delete_launch_template()
            .launch_template_id(id)
            .send()
            .await;

        match ignore_not_found(result).context("Failed to delete launch template")? {
            Some(_) => info!(template_id = %id, "Launch template deleted"),
            None => debug!(template_id = %id, "Launch template already deleted"),
        }
        Ok(())
    }
}

impl LaunchTemplateOps for Ec2Client {
    async fn create_launch_template(
        &self,
        name: &str,
        config: &LaunchTemplateConfig,
    ) -> Result<TemplateDescription> {
        Ec2Client::create_launch_template(self, name, config).await
    }

    async fn describe_launch_template(&self, id: &str) -> Result<TemplateDescription> {
        Ec2Client::describe_launch_template(self, id).await
    }
}

/// Map the pure config onto the EC2 launch template request schema.
///
/// The mapping is mechanical on purpose: every field of the config has
/// exactly one destination, and fields the config left out stay out of the
/// request.
fn request_data(config: &LaunchTemplateConfig) -> RequestLaunchTemplateData {
    let mut data = RequestLaunchTemplateData::builder()
        .ebs_optimized(config.ebs_optimized)
        .metadata_options(
            LaunchTemplateInstanceMetadataOptionsRequest::builder()
                .http_endpoint(config.metadata_options.http_endpoint.as_str().into())
                .http_put_response_hop_limit(config.metadata_options.http_put_response_hop_limit)
                .http_tokens(config.metadata_options.http_tokens.as_str().into())
                .build(),
        )
        .monitoring(
            LaunchTemplatesMonitoringRequest::builder()
                .enabled(config.monitoring.enabled)
                .build(),
        );

    if let Some(image_id) = &config.image_id {
        data = data.image_id(image_id);
    }
    if let Some(key_name) = &config.key_name {
        data = data.key_name(key_name);
    }
    if let Some(user_data) = &config.user_data {
        data = data.user_data(user_data);
    }

    for (device_name, device) in &config.block_device_mappings {
        data = data.block_device_mappings(block_device_request(device_name, device));
    }

    for group_id in &config.security_group_ids {
        data = data.security_group_ids(group_id);
    }

    for resource_type in &config.tag_specifications {
        data = data.tag_specifications(
            LaunchTemplateTagSpecificationRequest::builder()
                .resource_type(resource_type.as_str().into())
                .set_tags(Some(tag_list(&config.tags)))
                .build(),
        );
    }

    if let Some(cpu) = &config.cpu_options {
        data = data.cpu_options(
            LaunchTemplateCpuOptionsRequest::builder()
                .core_count(cpu.core_count)
                .threads_per_core(cpu.threads_per_core)
                .build(),
        );
    }

    if let Some(placement) = &config.placement {
        data = data.placement(placement_request(placement));
    }

    if let Some(enclave) = &config.enclave_options {
        data = data.enclave_options(
            LaunchTemplateEnclaveOptionsRequest::builder()
                .enabled(enclave.enabled)
                .build(),
        );
    }

    data.build()
}

fn block_device_request(
    device_name: &str,
    device: &BlockDevice,
) -> LaunchTemplateBlockDeviceMappingRequest {
    let mut mapping = LaunchTemplateBlockDeviceMappingRequest::builder().device_name(device_name);

    if device.no_device {
        // The EC2 API suppresses a device via an empty NoDevice string
        mapping = mapping.no_device("");
    }
    if let Some(virtual_name) = &device.virtual_name {
        mapping = mapping.virtual_name(virtual_name);
    }
    if let Some(ebs) = &device.ebs {
        let mut ebs_request = LaunchTemplateEbsBlockDeviceRequest::builder();
        if let Some(v) = ebs.delete_on_termination {
            ebs_request = ebs_request.delete_on_termination(v);
        }
        if let Some(v) = ebs.encrypted {
            ebs_request = ebs_request.encrypted(v);
        }
        if let Some(v) = ebs.iops {
            ebs_request = ebs_request.iops(v);
        }
        if let Some(v) = &ebs.kms_key_id {
            ebs_request = ebs_request.kms_key_id(v);
        }
        if let Some(v) = &ebs.snapshot_id {
            ebs_request = ebs_request.snapshot_id(v);
        }
        if let Some(v) = ebs.throughput {
            ebs_request = ebs_request.throughput(v);
        }
        if let Some(v) = ebs.volume_size {
            ebs_request = ebs_request.volume_size(v);
        }
        if let Some(v) = &ebs.volume_type {
            ebs_request = ebs_request.volume_type(v.as_str().into());
        }
        mapping = mapping.ebs(ebs_request.build());
    }

    mapping.build()
}

fn placement_request(placement: &PlacementSpec) -> LaunchTemplatePlacementRequest {
    let mut request = LaunchTemplatePlacementRequest::builder();

    if let Some(v) = &placement.affinity {
        request = request.affinity(v);
    }
    if let Some(v) = &placement.availability_zone {
        request = request.availability_zone(v);
    }
    if let Some(v) = &placement.group_name {
        request = request.group_name(v);
    }
    if let Some(v) = &placement.host_id {
        request = request.host_id(v);
    }
    if let Some(v) = &placement.host_resource_group_arn {
        request = request.host_resource_group_arn(v);
    }
    if let Some(v) = &placement.spread_domain {
        request = request.spread_domain(v);
    }
    if let Some(v) = &placement.tenancy {
        request = request.tenancy(v.as_str().into());
    }
    if let Some(v) = placement.partition_number {
        request = request.partition_number(v);
    }

    request.build()
}

fn tag_list(tags: &BTreeMap<String, String>) -> Vec<Tag> {
    tags.iter()
        .map(|(key, value)| Tag::builder().key(key).value(value).build())
        .collect()
}

/// Tags applied to the launch template resource itself
fn template_resource_tags(tags: &BTreeMap<String, String>) -> TagSpecification {
    TagSpecification::builder()
        .resource_type(ResourceType::LaunchTemplate)
        .set_tags(Some(tag_list(tags)))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodekit_common::node_group::{BlockDeviceSpec, EbsSpec, NodeGroupSpec};
    use nodekit_common::OsKind;

    fn config_for(spec: &NodeGroupSpec, groups: Vec<String>) -> LaunchTemplateConfig {
        LaunchTemplateConfig::from_node_group(spec, groups)
    }

    fn base_spec() -> NodeGroupSpec {
        NodeGroupSpec {
            os: OsKind::Al2,
            ..NodeGroupSpec::default()
        }
    }

    #[test]
    fn metadata_options_map_onto_request() {
        let data = request_data(&config_for(&base_spec(), vec![]));
        let metadata = data.metadata_options().unwrap();
        assert_eq!(metadata.http_endpoint().unwrap().as_str(), "enabled");
        assert_eq!(metadata.http_tokens().unwrap().as_str(), "required");
        assert_eq!(metadata.http_put_response_hop_limit(), Some(2));
    }

    #[test]
    fn security_groups_keep_merge_order() {
        let config = config_for(
            &base_spec(),
            vec!["sg-a".to_string(), "sg-b".to_string(), "sg-c".to_string()],
        );
        let data = request_data(&config);
        assert_eq!(data.security_group_ids(), ["sg-a", "sg-b", "sg-c"]);
    }

    #[test]
    fn tag_specifications_one_per_resource_type() {
        let mut spec = base_spec();
        spec.tags
            .insert("team".to_string(), "platform".to_string());
        let data = request_data(&config_for(&spec, vec![]));

        let specs = data.tag_specifications();
        assert_eq!(specs.len(), 3);
        for tag_spec in specs {
            let tags = tag_spec.tags();
            assert_eq!(tags.len(), 1);
            assert_eq!(tags[0].key().unwrap(), "team");
        }
    }

    #[test]
    fn enclave_options_absent_unless_enabled() {
        let data = request_data(&config_for(&base_spec(), vec![]));
        assert!(data.enclave_options().is_none());

        let spec = NodeGroupSpec {
            enclave_enabled: true,
            ..base_spec()
        };
        let data = request_data(&config_for(&spec, vec![]));
        assert_eq!(data.enclave_options().unwrap().enabled(), Some(true));
    }

    #[test]
    fn ebs_settings_only_set_when_supplied() {
        let spec = NodeGroupSpec {
            block_device_mappings: vec![BlockDeviceSpec {
                device_name: "/dev/xvda".to_string(),
                no_device: false,
                virtual_name: None,
                ebs: Some(EbsSpec {
                    volume_size: Some(80),
                    volume_type: Some("gp3".to_string()),
                    encrypted: Some(true),
                    ..EbsSpec::default()
                }),
            }],
            ..base_spec()
        };
        let data = request_data(&config_for(&spec, vec![]));

        let mappings = data.block_device_mappings();
        assert_eq!(mappings.len(), 1);
        let ebs = mappings[0].ebs().unwrap();
        assert_eq!(ebs.volume_size(), Some(80));
        assert_eq!(ebs.volume_type().unwrap().as_str(), "gp3");
        assert_eq!(ebs.encrypted(), Some(true));
        assert!(ebs.iops().is_none());
        assert!(ebs.snapshot_id().is_none());
    }

    #[test]
    fn image_and_user_data_pass_through() {
        let spec = NodeGroupSpec {
            ami_id: Some("ami-0123456789abcdef0".to_string()),
            userdata: Some("echo hi".to_string()),
            ..base_spec()
        };
        let config = config_for(&spec, vec![]);
        let data = request_data(&config);

        assert_eq!(data.image_id(), Some("ami-0123456789abcdef0"));
        assert_eq!(data.user_data(), config.user_data.as_deref());
    }
}
