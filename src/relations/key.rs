//! Canonical node identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical identity of a resource within the relation engine.
///
/// Built from kind and name, plus the apiVersion when one is known. Two
/// resources (or references) sharing a key are the same node; the key is used
/// for caching, in-flight de-duplication and cycle detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey(String);

impl NodeKey {
    pub fn new(kind: &str, name: &str, api_version: &str) -> Self {
        let kind = if kind.is_empty() { "<unk-kind>" } else { kind };
        let name = if name.is_empty() { "<unnamed>" } else { name };
        if api_version.is_empty() {
            Self(format!("{}|{}", kind, name))
        } else {
            Self(format!("{}|{}|{}", kind, name, api_version))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Reference, Resource};

    #[test]
    fn test_key_format() {
        assert_eq!(
            NodeKey::new("Bucket", "b1", "s3.aws/v1").as_str(),
            "Bucket|b1|s3.aws/v1"
        );
        assert_eq!(NodeKey::new("Bucket", "b1", "").as_str(), "Bucket|b1");
        assert_eq!(NodeKey::new("", "", "").as_str(), "<unk-kind>|<unnamed>");
    }

    #[test]
    fn test_reference_and_resource_share_key() {
        let reference = Reference::new("Bucket", "s3.aws/v1", "b1");
        let resource = Resource::new("Bucket", "s3.aws/v1", "b1");
        assert_eq!(reference.key(), resource.key());
    }

    #[test]
    fn test_namespace_not_part_of_key() {
        let mut a = Resource::new("Bucket", "s3.aws/v1", "b1");
        a.metadata.namespace = Some("team-a".to_string());
        let b = Resource::new("Bucket", "s3.aws/v1", "b1");
        assert_eq!(a.key(), b.key());
    }
}
