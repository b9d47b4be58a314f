//! Security group merging
//!
//! Combines the conditional security group sources of a node group into one
//! canonical list. The output is sorted and de-duplicated so re-evaluations
//! produce identical results regardless of input ordering, which keeps
//! downstream change detection quiet.

use std::collections::BTreeSet;

/// Merge security group ids from every enabled source.
///
/// The cluster security group only contributes when
/// `associate_cluster_security_group` is set and the cluster lookup produced
/// a value; the SSH access group only when the SSH sub-module created one.
/// Sources behind a disabled flag are never dereferenced, so a lookup that
/// was never performed cannot fail the merge.
pub fn merge_security_groups(
    associate_cluster_security_group: bool,
    cluster_security_group_id: Option<&str>,
    ssh_access_security_group_id: Option<&str>,
    additional_ids: &[String],
) -> Vec<String> {
    let mut merged = BTreeSet::new();

    if associate_cluster_security_group {
        if let Some(id) = cluster_security_group_id {
            merged.insert(id.to_string());
        }
    }

    if let Some(id) = ssh_access_security_group_id {
        merged.insert(id.to_string());
    }

    for id in additional_ids {
        merged.insert(id.clone());
    }

    merged.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_order_independent() {
        let forward = merge_security_groups(
            true,
            Some("sg-cluster"),
            Some("sg-ssh"),
            &["sg-b".to_string(), "sg-a".to_string()],
        );
        let backward = merge_security_groups(
            true,
            Some("sg-cluster"),
            Some("sg-ssh"),
            &["sg-a".to_string(), "sg-b".to_string()],
        );

        assert_eq!(forward, backward);
        assert_eq!(forward, vec!["sg-a", "sg-b", "sg-cluster", "sg-ssh"]);
    }

    #[test]
    fn cluster_group_excluded_when_association_disabled() {
        let merged = merge_security_groups(false, Some("sg-cluster"), None, &[]);
        assert!(merged.is_empty());
    }

    #[test]
    fn absent_sources_contribute_nothing() {
        let merged = merge_security_groups(true, None, None, &["sg-only".to_string()]);
        assert_eq!(merged, vec!["sg-only"]);
    }

    #[test]
    fn duplicates_collapse() {
        let merged = merge_security_groups(
            true,
            Some("sg-a"),
            Some("sg-a"),
            &["sg-a".to_string(), "sg-b".to_string()],
        );
        assert_eq!(merged, vec!["sg-a", "sg-b"]);
    }
}
