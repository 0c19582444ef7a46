//! Generated configuration model
//!
//! The output of the compiler: a [`VirtualServerConfig`] tree the template
//! renderer serializes into a server block, its upstreams, `split_clients`
//! blocks and `map` blocks. Every type here is plain data; the renderer is
//! the only consumer.
//!
//! Field order inside the vectors is meaningful and deterministic: the
//! compiler appends in source order and two compilations of the same input
//! produce identical models.

use serde::Serialize;
use std::collections::BTreeMap;

/// Complete generated configuration for one VirtualServer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VirtualServerConfig {
    pub upstreams: Vec<UpstreamConfig>,
    pub split_clients: Vec<SplitClient>,
    pub maps: Vec<MapBlock>,
    pub status_matches: Vec<StatusMatch>,
    pub server: ServerBlock,
}

// ============================================================================
// Upstreams
// ============================================================================

/// A generated `upstream` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpstreamConfig {
    pub name: String,
    pub servers: Vec<UpstreamServer>,
    /// Load-balancing directive; empty means the proxy's own default
    pub lb_method: String,
    /// Resolve server addresses at runtime (ExternalName services)
    pub resolve: bool,
    pub keepalive: i32,
    pub max_fails: i32,
    pub max_conns: i32,
    /// Commercial tier only; empty when disabled
    pub slow_start: String,
    pub fail_timeout: String,
    pub upstream_zone_size: String,
    /// Commercial tier only
    pub queue: Option<QueueConfig>,
    /// Commercial tier only
    pub session_cookie: Option<SessionCookieConfig>,
}

/// One `server` entry of an upstream block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpstreamServer {
    pub address: String,
}

/// A `queue` directive.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueConfig {
    pub size: i32,
    pub timeout: String,
}

/// A `sticky cookie` directive.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionCookieConfig {
    pub enable: bool,
    pub name: String,
    pub path: String,
    pub expires: String,
    pub domain: String,
    pub http_only: bool,
    pub secure: bool,
}

// ============================================================================
// Server
// ============================================================================

/// The generated `server` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerBlock {
    pub server_name: String,
    pub status_zone: String,
    pub proxy_protocol: bool,
    pub ssl: Option<Ssl>,
    pub server_tokens: String,
    /// Strict-Transport-Security settings, honored only with TLS
    pub hsts: bool,
    pub hsts_max_age: i64,
    pub hsts_include_subdomains: bool,
    pub real_ip_header: String,
    pub set_real_ip_from: Vec<String>,
    pub real_ip_recursive: bool,
    pub snippets: Vec<String>,
    pub internal_redirect_locations: Vec<InternalRedirectLocation>,
    pub locations: Vec<Location>,
    pub health_checks: Vec<HealthCheckConfig>,
    pub tls_redirect: Option<TlsRedirectConfig>,
}

/// TLS settings of a server block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ssl {
    pub http2: bool,
    pub certificate: String,
    pub certificate_key: String,
    /// Non-empty only for the missing-secret sentinel configuration
    pub ciphers: String,
}

/// HTTP-to-HTTPS redirect settings of a server block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TlsRedirectConfig {
    pub code: u16,
    /// `$scheme` or `$http_x_forwarded_proto`
    pub based_on: String,
}

// ============================================================================
// Locations
// ============================================================================

/// A generated `location` block, either proxying to an upstream or
/// answering with a `return`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Location {
    pub path: String,
    pub snippets: Vec<String>,
    pub proxy_connect_timeout: String,
    pub proxy_read_timeout: String,
    pub proxy_send_timeout: String,
    pub client_max_body_size: String,
    pub proxy_max_temp_file_size: String,
    pub proxy_buffering: bool,
    pub proxy_buffers: String,
    pub proxy_buffer_size: String,
    pub proxy_pass: String,
    pub proxy_next_upstream: String,
    pub proxy_next_upstream_timeout: String,
    pub proxy_next_upstream_tries: i32,
    pub has_keepalive: bool,
    /// `default_type` for return locations
    pub default_type: String,
    pub return_block: Option<ReturnBlock>,
}

/// A `return` directive used for redirects and canned responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReturnBlock {
    pub code: u16,
    pub text: String,
}

/// A location that internally redirects to a named location or to the
/// destination a variable evaluates to.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InternalRedirectLocation {
    pub path: String,
    pub destination: String,
}

// ============================================================================
// Split Clients and Maps
// ============================================================================

/// A `split_clients` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SplitClient {
    pub source: String,
    pub variable: String,
    pub distributions: Vec<Distribution>,
}

/// One weight entry of a split_clients block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Distribution {
    /// Percentage string such as `90%`
    pub weight: String,
    pub value: String,
}

/// A `map` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapBlock {
    pub source: String,
    pub variable: String,
    pub parameters: Vec<Parameter>,
}

/// One entry of a map block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Parameter {
    pub value: String,
    pub result: String,
}

// ============================================================================
// Health Checks
// ============================================================================

/// A generated `health_check` directive plus its probe settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthCheckConfig {
    pub name: String,
    pub uri: String,
    pub interval: String,
    pub jitter: String,
    pub fails: i32,
    pub passes: i32,
    pub port: u16,
    pub proxy_pass: String,
    pub proxy_connect_timeout: String,
    pub proxy_read_timeout: String,
    pub proxy_send_timeout: String,
    /// Probe request headers, ordered by name
    pub headers: BTreeMap<String, String>,
    /// Name of the companion status-match block, empty when none
    pub status_match: String,
}

/// A `match` block checking response status codes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusMatch {
    pub name: String,
    pub code: String,
}
