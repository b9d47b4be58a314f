//! AWS resource tag constants for nodekit
//!
//! Every resource nodekit creates carries these tags so it can be found and
//! cleaned up later, independent of whatever tags the user asked for.
//!
//! ## Tag Schema
//!
//! | Tag Key | Description |
//! |---------|-------------|
//! | `nodekit:managed-by` | Static identifier ("nodekit") |
//! | `nodekit:node-group` | Name of the node group the resource belongs to |

use std::collections::BTreeMap;

/// Tag key for tool identification - all nodekit resources have this
pub const TAG_MANAGED_BY: &str = "nodekit:managed-by";

/// Tag value for tool identification
pub const TAG_MANAGED_BY_VALUE: &str = "nodekit";

/// Tag key for the owning node group
pub const TAG_NODE_GROUP: &str = "nodekit:node-group";

/// Merge the standard nodekit tags into a user-supplied tag map.
///
/// The standard keys win over user values of the same name so discovery
/// stays reliable.
pub fn with_standard_tags(
    user_tags: &BTreeMap<String, String>,
    node_group: &str,
) -> BTreeMap<String, String> {
    let mut tags = user_tags.clone();
    tags.insert(TAG_MANAGED_BY.to_string(), TAG_MANAGED_BY_VALUE.to_string());
    tags.insert(TAG_NODE_GROUP.to_string(), node_group.to_string());
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_tags_added() {
        let user = BTreeMap::from([("team".to_string(), "platform".to_string())]);
        let tags = with_standard_tags(&user, "workers");

        assert_eq!(tags.get(TAG_MANAGED_BY).unwrap(), TAG_MANAGED_BY_VALUE);
        assert_eq!(tags.get(TAG_NODE_GROUP).unwrap(), "workers");
        assert_eq!(tags.get("team").unwrap(), "platform");
    }

    #[test]
    fn standard_tags_win_over_user_values() {
        let user = BTreeMap::from([(TAG_MANAGED_BY.to_string(), "someone-else".to_string())]);
        let tags = with_standard_tags(&user, "workers");
        assert_eq!(tags.get(TAG_MANAGED_BY).unwrap(), TAG_MANAGED_BY_VALUE);
    }
}
