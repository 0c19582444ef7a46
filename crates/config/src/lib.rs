//! Configuration compiler for Trellis routing resources
//!
//! This crate turns declarative VirtualServer / VirtualServerRoute
//! resources into a concrete reverse-proxy configuration model consumable
//! by the template renderer. It has two halves:
//!
//! - a total, path-annotated **validator** that rejects every malformed
//!   resource before any config is emitted, and
//! - a deterministic, name-stable **compiler** that lowers a validated
//!   VirtualServer plus its delegated VirtualServerRoutes and a snapshot
//!   of resolved endpoints into upstreams, locations, `split_clients`
//!   blocks and chained `map` blocks.
//!
//! # Module Organization
//!
//! - [`resources`]: input model (VirtualServer, VirtualServerRoute, ...)
//! - [`validation`]: field-path-tagged validation
//! - [`names`]: identifier generation (upstream names, variables, keys)
//! - [`endpoints`]: read-only endpoint snapshot
//! - [`params`]: fleet-wide defaults
//! - [`compiler`]: lowering to the generated model
//! - [`model`]: the generated configuration model
//! - [`warnings`]: per-resource warning accumulation
//!
//! # Example
//!
//! ```
//! use trellis_common::Tier;
//! use trellis_config::{
//!     validation::validate_virtual_server, ConfigParams, VirtualServer,
//!     VirtualServerCompiler, VirtualServerEx,
//! };
//!
//! let vs: VirtualServer = serde_json::from_value(serde_json::json!({
//!     "metadata": {"name": "cafe", "namespace": "default"},
//!     "spec": {
//!         "host": "cafe.example.com",
//!         "upstreams": [{"name": "tea", "service": "tea-svc", "port": 80}],
//!         "routes": [{"path": "/tea", "action": {"pass": "tea"}}]
//!     }
//! }))
//! .unwrap();
//!
//! assert!(validate_virtual_server(&vs, Tier::Oss).is_empty());
//!
//! let vs_ex = VirtualServerEx {
//!     virtual_server: vs,
//!     ..Default::default()
//! };
//! let compiler = VirtualServerCompiler::new(ConfigParams::default(), Tier::Oss, false);
//! let (config, warnings) = compiler.compile(&vs_ex, "");
//!
//! assert_eq!(config.upstreams[0].name, "vs_default_cafe_tea");
//! assert!(warnings.is_empty());
//! ```

pub mod compiler;
pub mod endpoints;
pub mod model;
pub mod names;
pub mod params;
pub mod resources;
pub mod validation;
pub mod warnings;

// Resources
pub use resources::{
    Action, ActionRedirect, ActionReturn, Condition, HealthCheck, Header, Match, Metadata,
    Route, SessionCookie, Split, Tls, TlsRedirect, Upstream, UpstreamBuffers, UpstreamQueue,
    UpstreamTls, VirtualServer, VirtualServerRoute, VirtualServerRouteSpec, VirtualServerSpec,
};

// Validation
pub use validation::{
    ensure_valid_virtual_server, ensure_valid_virtual_server_route, validate_virtual_server,
    validate_virtual_server_route, validate_virtual_server_route_for_virtual_server, ErrorKind,
    FieldPath, ValidationError,
};

// Compiler
pub use compiler::{
    endpoints_from_upstream, upstreams_for_commercial, ServerTuning, VirtualServerCompiler,
    VirtualServerEx, MISSING_TLS_SECRET_PEM, NGINX_502_SERVER,
};

// Endpoint index
pub use endpoints::EndpointIndex;

// Fleet defaults
pub use params::ConfigParams;

// Generated model
pub use model::VirtualServerConfig;

// Warnings
pub use warnings::Warnings;
