//! Collection descriptors
//!
//! The dependency-ordered list of sub-collections under one aggregate
//! type, declared once and processed by a single generic loop. Parents
//! appear before any child that references them by natural key; the
//! order is static, never inferred.

use serde::{Deserialize, Serialize};

use crate::deletion::DeletionMode;
use crate::matcher::KeySpec;

/// How a child collection references its parent.
///
/// The fetched record carries a nested placeholder (e.g.
/// `middleware_server: {ems_ref: "s1"}`); reconciliation rewrites it to a
/// scalar foreign key (`server_id`) holding the parent's internal
/// identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRule {
    /// Reserved field holding the nested parent reference.
    pub placeholder: String,

    /// Natural-key field inside the placeholder (and on the parent).
    pub key_field: String,

    /// Scalar foreign-key field written onto the child.
    pub fk_field: String,

    /// Parent collection name; must appear earlier in the descriptor
    /// list.
    pub parent: String,
}

/// Declarative reconciliation configuration for one collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    /// Collection name, matching the payload key.
    pub name: String,

    /// Natural-key declaration used for matching.
    pub key: KeySpec,

    /// Keys stripped from records before they are applied to entities.
    #[serde(default)]
    pub reserved: Vec<String>,

    /// Deletion mechanics for this collection's entities.
    pub deletion: DeletionMode,

    /// Parent link, for child collections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkRule>,
}

impl CollectionDescriptor {
    /// Create a descriptor with disconnect deletion and no link.
    pub fn new(name: impl Into<String>, key: KeySpec) -> Self {
        Self {
            name: name.into(),
            key,
            reserved: Vec::new(),
            deletion: DeletionMode::Disconnect,
            link: None,
        }
    }

    /// Set the deletion mode.
    pub fn with_deletion(mut self, deletion: DeletionMode) -> Self {
        self.deletion = deletion;
        self
    }

    /// Add a reserved key.
    pub fn with_reserved(mut self, key: impl Into<String>) -> Self {
        self.reserved.push(key.into());
        self
    }

    /// Declare the parent link. The placeholder is implicitly reserved.
    pub fn with_link(mut self, link: LinkRule) -> Self {
        if !self.reserved.contains(&link.placeholder) {
            self.reserved.push(link.placeholder.clone());
        }
        self.link = Some(link);
        self
    }
}

/// The middleware aggregate: servers, then deployments referencing them.
pub fn middleware_collections() -> Vec<CollectionDescriptor> {
    vec![
        CollectionDescriptor::new("servers", KeySpec::single("ems_ref")),
        CollectionDescriptor::new("deployments", KeySpec::single("ems_ref"))
            .with_deletion(DeletionMode::Purge)
            .with_link(LinkRule {
                placeholder: "middleware_server".to_string(),
                key_field: "ems_ref".to_string(),
                fk_field: "server_id".to_string(),
                parent: "servers".to_string(),
            }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middleware_order_is_parent_first() {
        let descriptors = middleware_collections();
        assert_eq!(descriptors[0].name, "servers");
        assert_eq!(descriptors[1].name, "deployments");

        let link = descriptors[1].link.as_ref().unwrap();
        assert_eq!(link.parent, "servers");
        assert_eq!(link.fk_field, "server_id");
    }

    #[test]
    fn test_link_placeholder_is_reserved() {
        let descriptors = middleware_collections();
        assert!(descriptors[1]
            .reserved
            .contains(&"middleware_server".to_string()));
    }

    #[test]
    fn test_deletion_modes() {
        let descriptors = middleware_collections();
        assert_eq!(descriptors[0].deletion, DeletionMode::Disconnect);
        assert_eq!(descriptors[1].deletion, DeletionMode::Purge);
    }
}
