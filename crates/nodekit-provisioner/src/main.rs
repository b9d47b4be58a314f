//! nodekit: provision EKS managed node groups and their launch templates

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use nodekit_common::{tags, TemplateSource};
use nodekit_provisioner::aws::eks::NodeGroupRequest;
use nodekit_provisioner::aws::{AwsContext, Ec2Client, EksClient};
use nodekit_provisioner::config::{self, ProvisionConfig, ScalingConfig};
use nodekit_provisioner::resolver::resolve_launch_template;

#[derive(Parser, Debug)]
#[command(name = "nodekit")]
#[command(about = "EKS managed node group provisioning")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a node group spec and print the resolved template source
    Plan {
        /// Path to the node group spec (JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// Cluster security group id to merge (skips the EKS lookup)
        #[arg(long)]
        cluster_security_group_id: Option<String>,

        /// SSH access security group id to merge
        #[arg(long)]
        ssh_security_group_id: Option<String>,
    },

    /// Resolve the launch template and create the node group
    Provision {
        /// Path to the node group spec (JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// EKS cluster name
        #[arg(long)]
        cluster: String,

        /// Node group name
        #[arg(long)]
        name: String,

        /// IAM role ARN for the nodes
        #[arg(long)]
        node_role_arn: String,

        /// Comma-separated subnet ids
        #[arg(long)]
        subnet_ids: String,

        /// AWS region
        #[arg(long, default_value = "us-east-1")]
        region: String,

        /// Desired node count
        #[arg(long, default_value = "2")]
        desired_size: i32,

        /// Minimum node count
        #[arg(long, default_value = "1")]
        min_size: i32,

        /// Maximum node count
        #[arg(long, default_value = "3")]
        max_size: i32,

        /// SSH access security group id to merge
        #[arg(long)]
        ssh_security_group_id: Option<String>,

        /// Block until the node group is active
        #[arg(long)]
        wait: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Plan {
            spec,
            cluster_security_group_id,
            ssh_security_group_id,
        } => {
            let spec = config::load_spec(&spec)?;
            let source = TemplateSource::for_node_group(
                &spec,
                cluster_security_group_id.as_deref(),
                ssh_security_group_id.as_deref(),
            )?;
            println!("{}", serde_json::to_string_pretty(&source)?);
            Ok(())
        }

        Command::Provision {
            spec,
            cluster,
            name,
            node_role_arn,
            subnet_ids,
            region,
            desired_size,
            min_size,
            max_size,
            ssh_security_group_id,
            wait,
        } => {
            let subnet_ids: Vec<String> = subnet_ids
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();

            let provision_config = ProvisionConfig {
                region,
                cluster_name: cluster,
                node_group_name: name,
                node_role_arn,
                subnet_ids,
                scaling: ScalingConfig {
                    desired_size,
                    min_size,
                    max_size,
                },
                wait,
            };

            provision(&spec, provision_config, ssh_security_group_id).await
        }
    }
}

async fn provision(
    spec_path: &PathBuf,
    config: ProvisionConfig,
    ssh_security_group_id: Option<String>,
) -> Result<()> {
    let mut spec = config::load_spec(spec_path)?;

    // Standard nodekit tags ride along with whatever the user declared
    spec.tags = tags::with_standard_tags(&spec.tags, &config.node_group_name);

    let aws = AwsContext::new(&config.region).await;
    let ec2 = Ec2Client::from_context(&aws);
    let eks = EksClient::from_context(&aws);

    // The cluster lookup only runs when the spec asks for the association,
    // so a missing cluster cannot fail an evaluation that never needed it
    let cluster_security_group_id = if spec.associate_cluster_security_group {
        eks.cluster_security_group_id(&config.cluster_name).await?
    } else {
        None
    };

    let source = TemplateSource::for_node_group(
        &spec,
        cluster_security_group_id.as_deref(),
        ssh_security_group_id.as_deref(),
    )?;

    let template_name = format!("{}-{}", config.cluster_name, config.node_group_name);
    let resolved = resolve_launch_template(&source, &template_name, &ec2).await?;

    let Some(template) = resolved else {
        info!("Node group disabled, nothing to provision");
        return Ok(());
    };

    let request = NodeGroupRequest {
        cluster_name: config.cluster_name.clone(),
        node_group_name: config.node_group_name.clone(),
        node_role_arn: config.node_role_arn.clone(),
        subnet_ids: config.subnet_ids.clone(),
        desired_size: config.scaling.desired_size,
        min_size: config.scaling.min_size,
        max_size: config.scaling.max_size,
        tags: spec.tags.clone(),
    };

    eks.create_node_group(&request, &template).await?;

    if config.wait {
        eks.wait_for_active(&config.cluster_name, &config.node_group_name, None)
            .await?;
    }

    info!(
        cluster = %config.cluster_name,
        node_group = %config.node_group_name,
        template_id = %template.id,
        template_version = %template.version,
        "Node group provisioned"
    );
    Ok(())
}
