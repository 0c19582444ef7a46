//! Identifier generation
//!
//! Every name emitted into the generated configuration comes from this
//! module, so that identifiers are unique across all resources a single
//! VirtualServer transitively compiles and stable under unrelated edits.
//!
//! Upstream names keep hyphens; NGINX variable names cannot contain them,
//! so the variable namer replaces `-` with `_` in the namespace/name part.

use std::collections::HashMap;

use crate::resources::{VirtualServer, VirtualServerRoute};

// ============================================================================
// Upstream Names
// ============================================================================

/// Produces upstream names scoped to the resource that owns the upstream.
#[derive(Debug, Clone)]
pub struct UpstreamNamer {
    prefix: String,
}

impl UpstreamNamer {
    /// Namer for upstreams defined on the VirtualServer itself:
    /// `vs_<ns>_<name>_<upstream>`.
    pub fn for_virtual_server(vs: &VirtualServer) -> Self {
        Self {
            prefix: format!("vs_{}_{}", vs.metadata.namespace, vs.metadata.name),
        }
    }

    /// Namer for upstreams defined on a delegated VirtualServerRoute:
    /// `vs_<ns>_<name>_vsr_<vsr-ns>_<vsr-name>_<upstream>`.
    pub fn for_virtual_server_route(vs: &VirtualServer, vsr: &VirtualServerRoute) -> Self {
        Self {
            prefix: format!(
                "vs_{}_{}_vsr_{}_{}",
                vs.metadata.namespace,
                vs.metadata.name,
                vsr.metadata.namespace,
                vsr.metadata.name
            ),
        }
    }

    pub fn name_for_upstream(&self, upstream: &str) -> String {
        format!("{}_{}", self.prefix, upstream)
    }
}

// ============================================================================
// Variable Names
// ============================================================================

/// Produces the NGINX variable names used by split-clients and match maps.
#[derive(Debug, Clone)]
pub struct VariableNamer {
    safe_ns_name: String,
}

impl VariableNamer {
    pub fn new(vs: &VirtualServer) -> Self {
        let safe_ns_name =
            format!("{}_{}", vs.metadata.namespace, vs.metadata.name).replace('-', "_");
        Self { safe_ns_name }
    }

    /// `$vs_<safe>_splits_<index>`
    pub fn split_client_variable(&self, index: usize) -> String {
        format!("$vs_{}_splits_{}", self.safe_ns_name, index)
    }

    /// `$vs_<safe>_matches_<m>_match_<k>_cond_<c>`
    pub fn matches_map_variable(
        &self,
        matches_index: usize,
        match_index: usize,
        condition_index: usize,
    ) -> String {
        format!(
            "$vs_{}_matches_{}_match_{}_cond_{}",
            self.safe_ns_name, matches_index, match_index, condition_index
        )
    }

    /// `$vs_<safe>_matches_<m>`
    pub fn matches_main_map_variable(&self, matches_index: usize) -> String {
        format!("$vs_{}_matches_{}", self.safe_ns_name, matches_index)
    }

    #[cfg(test)]
    pub(crate) fn safe_ns_name(&self) -> &str {
        &self.safe_ns_name
    }
}

// ============================================================================
// Named Locations
// ============================================================================

/// `@splits_<s>_split_<j>`
pub fn split_location_name(sc_index: usize, split_index: usize) -> String {
    format!("@splits_{}_split_{}", sc_index, split_index)
}

/// `@matches_<m>_match_<k>`
pub fn match_location_name(matches_index: usize, match_index: usize) -> String {
    format!("@matches_{}_match_{}", matches_index, match_index)
}

/// `@matches_<m>_default`
pub fn match_default_location_name(matches_index: usize) -> String {
    format!("@matches_{}_default", matches_index)
}

// ============================================================================
// Endpoint Keys
// ============================================================================

/// Key into the endpoint table for a service port, optionally narrowed by
/// a subselector. Subselector labels are serialized sorted by key so the
/// same selector always produces the same key.
pub fn endpoints_key(
    service_namespace: &str,
    service_name: &str,
    subselector: &HashMap<String, String>,
    port: u16,
) -> String {
    if subselector.is_empty() {
        return format!("{}/{}:{}", service_namespace, service_name, port);
    }

    let mut labels: Vec<(&String, &String)> = subselector.iter().collect();
    labels.sort_by_key(|(k, _)| k.as_str());
    let selector = labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",");

    format!("{}/{}_{}:{}", service_namespace, service_name, selector, port)
}

/// Key identifying an ExternalName service.
pub fn external_name_service_key(namespace: &str, service: &str) -> String {
    format!("{}/{}", namespace, service)
}

/// Name of the status-match block attached to an upstream's health check.
pub fn status_match_name(upstream_name: &str) -> String {
    format!("{}_match", upstream_name)
}

// ============================================================================
// Tests
// ============================================================================
