//! Launch template resolution
//!
//! Turns a [`TemplateSource`] decision into a concrete template reference by
//! invoking at most one delegate. Delegate failures propagate unchanged;
//! retry policy belongs to the delegate implementations, not here.

use std::future::Future;

use anyhow::Result;
use nodekit_common::launch_template::LaunchTemplateConfig;
use nodekit_common::TemplateSource;
use tracing::{debug, info};

/// A launch template as reported by a delegate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDescription {
    /// Launch template id
    pub id: String,
    /// Latest version number of the template
    pub latest_version: i64,
}

/// Resolved template reference handed to node group creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLaunchTemplate {
    /// Launch template id
    pub id: String,
    /// The explicitly requested version, or the latest version of whichever
    /// template is in effect
    pub version: String,
}

/// Launch template operations that can be mocked in tests.
///
/// This trait abstracts the EC2 calls so resolution logic can be unit tested
/// without hitting real AWS.
pub trait LaunchTemplateOps: Send + Sync {
    /// Create a launch template from an assembled config
    fn create_launch_template(
        &self,
        name: &str,
        config: &LaunchTemplateConfig,
    ) -> impl Future<Output = Result<TemplateDescription>> + Send;

    /// Look up an existing launch template by id
    fn describe_launch_template(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<TemplateDescription>> + Send;
}

/// Resolve the effective launch template for one evaluation.
///
/// Invokes at most one delegate: describe for an existing id, create for a
/// generated config, neither when disabled. Each evaluation is independent;
/// re-running with the same source and the same delegate responses yields
/// the same reference.
pub async fn resolve_launch_template<O: LaunchTemplateOps>(
    source: &TemplateSource,
    name: &str,
    ops: &O,
) -> Result<Option<ResolvedLaunchTemplate>> {
    match source {
        TemplateSource::Disabled => {
            debug!("launch template resolution disabled");
            Ok(None)
        }
        TemplateSource::Fetch { id, version } => {
            let described = ops.describe_launch_template(id).await?;
            let resolved = ResolvedLaunchTemplate {
                version: effective_version(version.as_deref(), described.latest_version),
                id: described.id,
            };
            info!(
                template_id = %resolved.id,
                version = %resolved.version,
                "Using existing launch template"
            );
            Ok(Some(resolved))
        }
        TemplateSource::Generate { config, version } => {
            let created = ops.create_launch_template(name, config).await?;
            let resolved = ResolvedLaunchTemplate {
                version: effective_version(version.as_deref(), created.latest_version),
                id: created.id,
            };
            info!(
                template_id = %resolved.id,
                version = %resolved.version,
                "Generated launch template"
            );
            Ok(Some(resolved))
        }
    }
}

fn effective_version(requested: Option<&str>, latest: i64) -> String {
    match requested {
        Some(version) => version.to_string(),
        None => latest.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use nodekit_common::{NodeGroupSpec, OsKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counting mock delegate
    struct MockOps {
        create_calls: AtomicUsize,
        describe_calls: AtomicUsize,
        fail: bool,
    }

    impl MockOps {
        fn new() -> Self {
            Self {
                create_calls: AtomicUsize::new(0),
                describe_calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }
    }

    impl LaunchTemplateOps for MockOps {
        async fn create_launch_template(
            &self,
            _name: &str,
            _config: &LaunchTemplateConfig,
        ) -> Result<TemplateDescription> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                bail!("CreateLaunchTemplate rejected");
            }
            Ok(TemplateDescription {
                id: "lt-generated".to_string(),
                latest_version: 1,
            })
        }

        async fn describe_launch_template(&self, id: &str) -> Result<TemplateDescription> {
            self.describe_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                bail!("launch template {id} not found");
            }
            Ok(TemplateDescription {
                id: id.to_string(),
                latest_version: 7,
            })
        }
    }

    fn generate_source() -> TemplateSource {
        let spec = NodeGroupSpec {
            os: OsKind::Al2,
            ..NodeGroupSpec::default()
        };
        TemplateSource::for_node_group(&spec, Some("sg-cluster"), None).unwrap()
    }

    fn fetch_source(version: Option<&str>) -> TemplateSource {
        TemplateSource::Fetch {
            id: "lt-0abc".to_string(),
            version: version.map(|v| v.to_string()),
        }
    }

    #[tokio::test]
    async fn disabled_invokes_no_delegate() {
        let ops = MockOps::new();
        let resolved = resolve_launch_template(&TemplateSource::Disabled, "workers", &ops)
            .await
            .unwrap();
        assert!(resolved.is_none());
        assert_eq!(ops.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(ops.describe_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_path_never_creates() {
        let ops = MockOps::new();
        let resolved = resolve_launch_template(&fetch_source(None), "workers", &ops)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(resolved.id, "lt-0abc");
        assert_eq!(resolved.version, "7");
        assert_eq!(ops.describe_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ops.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generate_path_never_fetches() {
        let ops = MockOps::new();
        let resolved = resolve_launch_template(&generate_source(), "workers", &ops)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(resolved.id, "lt-generated");
        assert_eq!(resolved.version, "1");
        assert_eq!(ops.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ops.describe_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn explicit_version_wins_over_latest() {
        let ops = MockOps::new();
        let resolved = resolve_launch_template(&fetch_source(Some("3")), "workers", &ops)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.version, "3");
    }

    #[tokio::test]
    async fn resolution_is_idempotent() {
        let ops = MockOps::new();
        let source = generate_source();
        let first = resolve_launch_template(&source, "workers", &ops).await.unwrap();
        let second = resolve_launch_template(&source, "workers", &ops).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn delegate_failures_propagate() {
        let ops = MockOps::failing();
        let err = resolve_launch_template(&fetch_source(None), "workers", &ops)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));

        let err = resolve_launch_template(&generate_source(), "workers", &ops)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rejected"));
    }
}
