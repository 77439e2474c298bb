//! Routing attribute / 路由属性

use serde::{Deserialize, Serialize};

/// Resolved routing decision for one unit of work / 一次调用的路由决策
///
/// Immutable once built. An empty client or bucket means "unspecified",
/// the facade then defers to the primary client or the client's own bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    client: String,
    bucket: String,
}

impl Attribute {
    pub fn new(client: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            bucket: bucket.into(),
        }
    }

    /// Empty sentinel pushed for calls without a declaration / 空属性
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn client(&self) -> Option<&str> {
        non_blank(&self.client)
    }

    pub fn bucket(&self) -> Option<&str> {
        non_blank(&self.bucket)
    }

    pub fn is_empty(&self) -> bool {
        self.client().is_none() && self.bucket().is_none()
    }
}

fn non_blank(s: &str) -> Option<&str> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fields_are_unspecified() {
        let attr = Attribute::new("  ", "");
        assert!(attr.is_empty());
        assert_eq!(attr.client(), None);
        assert_eq!(attr.bucket(), None);
    }

    #[test]
    fn test_accessors() {
        let attr = Attribute::new("MINIO", "avatars");
        assert_eq!(attr.client(), Some("MINIO"));
        assert_eq!(attr.bucket(), Some("avatars"));
        assert!(!attr.is_empty());
    }
}
