//! Resource identifier types for Trellis.
//!
//! These types identify the Kubernetes resources a compilation touches,
//! preventing accidental mixing of namespaces and names and giving
//! warnings a stable key.
//!
//! ```
//! use trellis_common::ids::{ResourceId, ResourceKind};
//!
//! let id = ResourceId::virtual_server("default", "cafe");
//! assert_eq!(id.to_string(), "default/cafe");
//! assert_eq!(id.kind, ResourceKind::VirtualServer);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of routing resource an identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    VirtualServer,
    VirtualServerRoute,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::VirtualServer => write!(f, "VirtualServer"),
            ResourceKind::VirtualServerRoute => write!(f, "VirtualServerRoute"),
        }
    }
}

/// Identity of a routing resource: kind plus namespace/name.
///
/// Used to key per-resource warning lists so the caller can surface each
/// message against the object that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
}

impl ResourceId {
    /// Identity of a VirtualServer
    pub fn virtual_server(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::VirtualServer,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of a VirtualServerRoute
    pub fn virtual_server_route(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::VirtualServerRoute,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_namespace_slash_name() {
        let id = ResourceId::virtual_server("default", "cafe");
        assert_eq!(id.to_string(), "default/cafe");

        let id = ResourceId::virtual_server_route("team-a", "coffee");
        assert_eq!(id.to_string(), "team-a/coffee");
    }

    #[test]
    fn test_kinds_are_distinct_keys() {
        let vs = ResourceId::virtual_server("default", "cafe");
        let vsr = ResourceId::virtual_server_route("default", "cafe");
        assert_ne!(vs, vsr);
    }
}
