//! Endpoint index
//!
//! A read-only snapshot of resolved service endpoints, keyed by the
//! endpoint keys from [`crate::names`]. The surrounding control loop
//! builds one of these per compilation from its service/endpoint caches;
//! the compiler only ever reads it.

use std::collections::{HashMap, HashSet};

/// Resolved endpoints plus the set of services of type ExternalName.
#[derive(Debug, Clone, Default)]
pub struct EndpointIndex {
    /// `<ns>/<service>[_<selector>]:<port>` -> list of `host:port`
    pub endpoints: HashMap<String, Vec<String>>,

    /// `<ns>/<service>` keys of ExternalName services
    pub external_name_services: HashSet<String>,
}

impl EndpointIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoints for a key; missing keys resolve to no endpoints.
    pub fn endpoints_for(&self, key: &str) -> &[String] {
        self.endpoints.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_external_name_service(&self, key: &str) -> bool {
        self.external_name_services.contains(key)
    }
}
