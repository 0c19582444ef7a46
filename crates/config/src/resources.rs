//! VirtualServer and VirtualServerRoute resource types
//!
//! This module contains the input model of the compiler: the declarative
//! routing resources as they arrive from the cluster. Field names follow
//! the wire format of the resources, so a document can be deserialized
//! directly with serde.
//!
//! The types here are a faithful snapshot of what the user wrote. Unset
//! numeric knobs are `None` (not `0`) so that an explicit zero survives
//! deserialization; the compiler relies on that distinction when deciding
//! between a user value and a fleet default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, trace};

use trellis_common::ids::ResourceId;

// ============================================================================
// Resource Envelopes
// ============================================================================

/// Object metadata carried by every routing resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

/// VirtualServer resource: the root of a routing tree for one host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualServer {
    #[serde(default)]
    pub metadata: Metadata,
    pub spec: VirtualServerSpec,
}

/// Spec of a VirtualServer resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualServerSpec {
    /// Host this server answers for (DNS subdomain)
    #[serde(default)]
    pub host: String,

    /// TLS termination settings
    #[serde(default)]
    pub tls: Option<Tls>,

    /// Upstream pools referenced by the routes of this resource
    #[serde(default)]
    pub upstreams: Vec<Upstream>,

    /// Ordered routing rules
    #[serde(default)]
    pub routes: Vec<Route>,
}

/// VirtualServerRoute resource: a subtree of routes delegated from a
/// VirtualServer via a `route` reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualServerRoute {
    #[serde(default)]
    pub metadata: Metadata,
    pub spec: VirtualServerRouteSpec,
}

/// Spec of a VirtualServerRoute resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualServerRouteSpec {
    /// Must equal the host of the parent VirtualServer
    #[serde(default)]
    pub host: String,

    /// Upstream pools owned by this resource (own namespace scope)
    #[serde(default)]
    pub upstreams: Vec<Upstream>,

    /// Ordered routing rules under the delegated path
    #[serde(default)]
    pub subroutes: Vec<Route>,
}

impl VirtualServer {
    /// Identity of this resource for warnings and diagnostics.
    pub fn resource_id(&self) -> ResourceId {
        ResourceId::virtual_server(&self.metadata.namespace, &self.metadata.name)
    }

    /// Parse a VirtualServer from a JSON document.
    pub fn from_json(content: &str) -> Result<Self> {
        trace!(content_length = content.len(), "Parsing VirtualServer JSON");
        serde_json::from_str(content).context("Failed to parse VirtualServer document")
    }

    /// Load a VirtualServer from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read VirtualServer file: {:?}", path))?;
        let vs = Self::from_json(&content)?;
        debug!(
            path = %path.display(),
            host = %vs.spec.host,
            upstreams = vs.spec.upstreams.len(),
            routes = vs.spec.routes.len(),
            "Loaded VirtualServer"
        );
        Ok(vs)
    }
}

impl VirtualServerRoute {
    /// Identity of this resource for warnings and diagnostics.
    pub fn resource_id(&self) -> ResourceId {
        ResourceId::virtual_server_route(&self.metadata.namespace, &self.metadata.name)
    }

    /// Parse a VirtualServerRoute from a JSON document.
    pub fn from_json(content: &str) -> Result<Self> {
        trace!(content_length = content.len(), "Parsing VirtualServerRoute JSON");
        serde_json::from_str(content).context("Failed to parse VirtualServerRoute document")
    }

    /// Load a VirtualServerRoute from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read VirtualServerRoute file: {:?}", path))?;
        let vsr = Self::from_json(&content)?;
        debug!(
            path = %path.display(),
            host = %vsr.spec.host,
            upstreams = vsr.spec.upstreams.len(),
            subroutes = vsr.spec.subroutes.len(),
            "Loaded VirtualServerRoute"
        );
        Ok(vsr)
    }
}

// ============================================================================
// Upstreams
// ============================================================================

/// A named pool of backend endpoints with tuning knobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Upstream {
    /// Pool name, unique within the owning resource (DNS-1035 label)
    #[serde(default)]
    pub name: String,

    /// Target service name in the owning resource's namespace
    #[serde(default)]
    pub service: String,

    /// Optional pod label subselector narrowing the service endpoints
    #[serde(default)]
    pub subselector: HashMap<String, String>,

    /// Target service port
    #[serde(default)]
    pub port: u16,

    /// Load-balancing method; empty means the fleet default
    #[serde(default, rename = "lb-method")]
    pub lb_method: String,

    #[serde(default, rename = "fail-timeout")]
    pub fail_timeout: String,

    #[serde(default, rename = "max-fails")]
    pub max_fails: Option<i32>,

    #[serde(default, rename = "max-conns")]
    pub max_conns: Option<i32>,

    /// Idle keepalive connections to this pool; explicit 0 disables
    #[serde(default)]
    pub keepalive: Option<i32>,

    #[serde(default, rename = "connect-timeout")]
    pub proxy_connect_timeout: String,

    #[serde(default, rename = "read-timeout")]
    pub proxy_read_timeout: String,

    #[serde(default, rename = "send-timeout")]
    pub proxy_send_timeout: String,

    /// Conditions under which a request is retried on the next server
    #[serde(default, rename = "next-upstream")]
    pub proxy_next_upstream: String,

    #[serde(default, rename = "next-upstream-timeout")]
    pub proxy_next_upstream_timeout: String,

    #[serde(default, rename = "next-upstream-tries")]
    pub proxy_next_upstream_tries: i32,

    #[serde(default, rename = "buffering")]
    pub proxy_buffering: Option<bool>,

    #[serde(default, rename = "buffers")]
    pub proxy_buffers: Option<UpstreamBuffers>,

    #[serde(default, rename = "buffer-size")]
    pub proxy_buffer_size: String,

    #[serde(default, rename = "client-max-body-size")]
    pub client_max_body_size: String,

    /// TLS towards the backends
    #[serde(default)]
    pub tls: UpstreamTls,

    /// Active health check (commercial tier only)
    #[serde(default, rename = "healthCheck")]
    pub health_check: Option<HealthCheck>,

    /// Slow-start ramp-up time (commercial tier only)
    #[serde(default, rename = "slow-start")]
    pub slow_start: String,

    /// Request queue for saturated pools (commercial tier only)
    #[serde(default)]
    pub queue: Option<UpstreamQueue>,

    /// Session persistence cookie (commercial tier only)
    #[serde(default, rename = "sessionCookie")]
    pub session_cookie: Option<SessionCookie>,
}

/// Proxy buffer configuration for an upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamBuffers {
    #[serde(default)]
    pub number: i32,
    #[serde(default)]
    pub size: String,
}

/// TLS configuration towards upstream backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamTls {
    #[serde(default)]
    pub enable: bool,
}

/// Active health check parameters for an upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    #[serde(default)]
    pub enable: bool,

    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub interval: String,

    #[serde(default)]
    pub jitter: String,

    #[serde(default)]
    pub fails: i32,

    #[serde(default)]
    pub passes: i32,

    /// Probe port; 0 means the upstream port
    #[serde(default)]
    pub port: i32,

    #[serde(default)]
    pub tls: Option<UpstreamTls>,

    #[serde(default, rename = "connect-timeout")]
    pub connect_timeout: String,

    #[serde(default, rename = "read-timeout")]
    pub read_timeout: String,

    #[serde(default, rename = "send-timeout")]
    pub send_timeout: String,

    /// Extra request headers sent with each probe
    #[serde(default)]
    pub headers: Vec<Header>,

    /// Expected response status, e.g. `"200-399"` or `"! 500"`
    #[serde(default, rename = "statusMatch")]
    pub status_match: String,
}

/// An HTTP header name/value pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Session persistence cookie parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionCookie {
    #[serde(default)]
    pub enable: bool,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub path: String,

    /// Cookie lifetime; accepts a duration or the literal `max`
    #[serde(default)]
    pub expires: String,

    #[serde(default)]
    pub domain: String,

    #[serde(default, rename = "httpOnly")]
    pub http_only: bool,

    #[serde(default)]
    pub secure: bool,
}

/// Request queue configuration for an upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamQueue {
    #[serde(default)]
    pub size: i32,
    #[serde(default)]
    pub timeout: String,
}

// ============================================================================
// Routes
// ============================================================================

/// A routing rule: a path plus exactly one of `action`, `splits` or
/// `route` (delegation), optionally guarded by `matches`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Prefix (`/...`), regex (`~ ...` / `~* ...`) or exact (`=/...`) path
    #[serde(default)]
    pub path: String,

    /// Delegation target `<namespace>/<name>` of a VirtualServerRoute
    #[serde(default)]
    pub route: String,

    /// Terminal action for this route
    #[serde(default)]
    pub action: Option<Action>,

    /// Weighted traffic splits (at least two, weights sum to 100)
    #[serde(default)]
    pub splits: Vec<Split>,

    /// Condition-guarded overrides evaluated before the default action
    #[serde(default)]
    pub matches: Vec<Match>,
}

/// Exactly one of `pass`, `redirect` or `return`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Name of an upstream defined in the same resource
    #[serde(default)]
    pub pass: String,

    #[serde(default)]
    pub redirect: Option<ActionRedirect>,

    #[serde(default, rename = "return")]
    pub return_: Option<ActionReturn>,
}

/// Redirect the request to a URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRedirect {
    /// Target URL; may reference `${scheme}`, `${host}`,
    /// `${http_x_forwarded_proto}` and `${request_uri}`
    #[serde(default)]
    pub url: String,

    /// Redirect status code; defaults to 301
    #[serde(default)]
    pub code: Option<u16>,
}

/// Answer the request with a canned response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionReturn {
    /// Response status code; defaults to 200
    #[serde(default)]
    pub code: Option<u16>,

    /// MIME type; defaults to `text/plain`
    #[serde(default, rename = "type")]
    pub type_: String,

    #[serde(default)]
    pub body: String,
}

/// One leg of a weighted traffic split.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Split {
    /// Percentage of traffic, 1-99
    #[serde(default)]
    pub weight: i32,

    #[serde(default)]
    pub action: Option<Action>,
}

/// A condition-guarded routing override. All conditions must hold (AND);
/// multiple matches within a route are tried in order (OR).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Match {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub action: Option<Action>,

    #[serde(default)]
    pub splits: Vec<Split>,
}

/// A single request predicate: exactly one of `header`, `cookie`,
/// `argument` or `variable`, compared against `value`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub header: String,

    #[serde(default)]
    pub cookie: String,

    #[serde(default)]
    pub argument: String,

    /// NGINX variable from the condition whitelist, e.g. `$request_method`
    #[serde(default)]
    pub variable: String,

    /// Expected value; a leading `!` negates the comparison
    #[serde(default)]
    pub value: String,
}

// ============================================================================
// TLS
// ============================================================================

/// TLS termination settings of a VirtualServer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tls {
    /// Name of the TLS secret holding certificate and key
    #[serde(default)]
    pub secret: String,

    #[serde(default)]
    pub redirect: Option<TlsRedirect>,
}

/// HTTP-to-HTTPS redirect settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TlsRedirect {
    #[serde(default)]
    pub enable: bool,

    /// Redirect status code; defaults to 301
    #[serde(default)]
    pub code: Option<u16>,

    /// `scheme` (default) or `x-forwarded-proto`
    #[serde(default, rename = "basedOn")]
    pub based_on: String,
}

// ============================================================================
// Tests
// ============================================================================
