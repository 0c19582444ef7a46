//! Configuration compiler
//!
//! Lowers a validated VirtualServer, the VirtualServerRoutes it delegates
//! to, and a snapshot of resolved endpoints into a
//! [`VirtualServerConfig`] for the template renderer.
//!
//! The compiler is pure: one call reads one immutable snapshot and
//! returns a fresh model plus the warnings collected along the way. Match
//! and split-client indices are assigned in source order and threaded
//! across the whole walk, so identifiers are unique within the generated
//! config and stable across compilations of the same input.
//!
//! Inputs that did not pass validation are not supported here; the
//! compiler is not defensive about them.

mod routing;
mod upstreams;

pub use upstreams::{endpoints_from_upstream, upstreams_for_commercial, ServerTuning};

use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use trellis_common::{ResourceId, Tier};

use crate::endpoints::EndpointIndex;
use crate::model::{
    HealthCheckConfig, InternalRedirectLocation, Location, MapBlock, ServerBlock, SplitClient,
    Ssl, StatusMatch, TlsRedirectConfig, UpstreamConfig, VirtualServerConfig,
};
use crate::names::{self, UpstreamNamer, VariableNamer};
use crate::params::ConfigParams;
use crate::resources::{Route, Tls, Upstream, VirtualServer, VirtualServerRoute};
use crate::warnings::Warnings;

/// Backend address emitted on the OSS tier when a service has no
/// endpoints, so the proxy answers 502 instead of failing to load.
pub const NGINX_502_SERVER: &str = "unix:/var/lib/nginx/nginx-502-server.sock";

/// Certificate path emitted when a referenced TLS secret is missing from
/// the cluster. Combined with the `NULL` cipher string it makes TLS
/// handshakes fail cleanly instead of serving an arbitrary certificate.
pub const MISSING_TLS_SECRET_PEM: &str = "/etc/nginx/secrets/default";

// ============================================================================
// Input Bundle
// ============================================================================

/// A VirtualServer along with every resource referenced by it.
#[derive(Debug, Clone, Default)]
pub struct VirtualServerEx {
    pub virtual_server: VirtualServer,
    pub virtual_server_routes: Vec<VirtualServerRoute>,
    pub endpoints: EndpointIndex,
}

impl fmt::Display for VirtualServerEx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.virtual_server.metadata.namespace, self.virtual_server.metadata.name
        )
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles VirtualServer bundles into renderable configurations.
#[derive(Debug, Clone)]
pub struct VirtualServerCompiler {
    params: ConfigParams,
    tier: Tier,
    resolver_configured: bool,
}

impl VirtualServerCompiler {
    pub fn new(params: ConfigParams, tier: Tier, resolver_configured: bool) -> Self {
        Self {
            params,
            tier,
            resolver_configured,
        }
    }

    pub fn params(&self) -> &ConfigParams {
        &self.params
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub(crate) fn resolver_configured(&self) -> bool {
        self.resolver_configured
    }

    /// Generate the full configuration for a VirtualServer.
    ///
    /// `tls_pem_filename` is the resolved certificate path for the TLS
    /// secret, or empty when the secret is missing from the cluster.
    pub fn compile(
        &self,
        vs_ex: &VirtualServerEx,
        tls_pem_filename: &str,
    ) -> (VirtualServerConfig, Warnings) {
        let vs = &vs_ex.virtual_server;
        let mut warnings = Warnings::new();

        let ssl = generate_ssl_config(vs.spec.tls.as_ref(), tls_pem_filename, &self.params);
        let tls_redirect = generate_tls_redirect_config(vs.spec.tls.as_ref());

        // Maps each generated upstream name back to its resource upstream,
        // so location generation can read the tuning knobs of the pool a
        // `pass` action refers to.
        let mut cr_upstreams: HashMap<String, Upstream> = HashMap::new();

        let vs_namer = UpstreamNamer::for_virtual_server(vs);

        let mut upstream_configs: Vec<UpstreamConfig> = Vec::new();
        let mut status_matches: Vec<StatusMatch> = Vec::new();
        let mut health_checks: Vec<HealthCheckConfig> = Vec::new();

        // Upstreams of the VirtualServer itself.
        let vs_id = vs.resource_id();
        for u in &vs.spec.upstreams {
            let upstream_name = vs_namer.name_for_upstream(&u.name);
            self.lower_upstream(
                &vs_id,
                &vs.metadata.namespace,
                u,
                upstream_name,
                vs_ex,
                &mut upstream_configs,
                &mut health_checks,
                &mut status_matches,
                &mut cr_upstreams,
                &mut warnings,
            );
        }

        // Upstreams of each VirtualServerRoute, in input order.
        for vsr in &vs_ex.virtual_server_routes {
            let vsr_namer = UpstreamNamer::for_virtual_server_route(vs, vsr);
            let vsr_id = vsr.resource_id();
            for u in &vsr.spec.upstreams {
                let upstream_name = vsr_namer.name_for_upstream(&u.name);
                self.lower_upstream(
                    &vsr_id,
                    &vsr.metadata.namespace,
                    u,
                    upstream_name,
                    vs_ex,
                    &mut upstream_configs,
                    &mut health_checks,
                    &mut status_matches,
                    &mut cr_upstreams,
                    &mut warnings,
                );
            }
        }

        let mut locations: Vec<Location> = Vec::new();
        let mut internal_redirect_locations: Vec<InternalRedirectLocation> = Vec::new();
        let mut split_clients: Vec<SplitClient> = Vec::new();
        let mut maps: Vec<MapBlock> = Vec::new();

        let mut matches_routes = 0usize;
        let variable_namer = VariableNamer::new(vs);

        // Routes of the VirtualServer. Routes that delegate to a
        // VirtualServerRoute are handled by the subroute walk below.
        for route in &vs.spec.routes {
            if !route.route.is_empty() {
                continue;
            }

            self.lower_route(
                route,
                &vs_namer,
                &cr_upstreams,
                &variable_namer,
                &mut matches_routes,
                &mut maps,
                &mut split_clients,
                &mut locations,
                &mut internal_redirect_locations,
            );
        }

        // Subroutes of each VirtualServerRoute.
        for vsr in &vs_ex.virtual_server_routes {
            let vsr_namer = UpstreamNamer::for_virtual_server_route(vs, vsr);
            for route in &vsr.spec.subroutes {
                self.lower_route(
                    route,
                    &vsr_namer,
                    &cr_upstreams,
                    &variable_namer,
                    &mut matches_routes,
                    &mut maps,
                    &mut split_clients,
                    &mut locations,
                    &mut internal_redirect_locations,
                );
            }
        }

        let config = VirtualServerConfig {
            upstreams: upstream_configs,
            split_clients,
            maps,
            status_matches,
            server: ServerBlock {
                server_name: vs.spec.host.clone(),
                status_zone: vs.spec.host.clone(),
                proxy_protocol: self.params.proxy_protocol,
                ssl,
                server_tokens: self.params.server_tokens.clone(),
                hsts: self.params.hsts,
                hsts_max_age: self.params.hsts_max_age,
                hsts_include_subdomains: self.params.hsts_include_subdomains,
                real_ip_header: self.params.real_ip_header.clone(),
                set_real_ip_from: self.params.set_real_ip_from.clone(),
                real_ip_recursive: self.params.real_ip_recursive,
                snippets: self.params.server_snippets.clone(),
                internal_redirect_locations,
                locations,
                health_checks,
                tls_redirect,
            },
        };

        debug!(
            resource = %vs_ex,
            upstreams = config.upstreams.len(),
            locations = config.server.locations.len(),
            maps = config.maps.len(),
            split_clients = config.split_clients.len(),
            warnings = warnings.len(),
            "Compiled VirtualServer"
        );

        (config, warnings)
    }

    #[allow(clippy::too_many_arguments)]
    fn lower_upstream(
        &self,
        owner: &ResourceId,
        namespace: &str,
        upstream: &Upstream,
        upstream_name: String,
        vs_ex: &VirtualServerEx,
        upstream_configs: &mut Vec<UpstreamConfig>,
        health_checks: &mut Vec<HealthCheckConfig>,
        status_matches: &mut Vec<StatusMatch>,
        cr_upstreams: &mut HashMap<String, Upstream>,
        warnings: &mut Warnings,
    ) {
        let endpoints =
            self.generate_endpoints_for_upstream(owner, namespace, upstream, vs_ex, warnings);

        let external_key = names::external_name_service_key(namespace, &upstream.service);
        let is_external_name = vs_ex.endpoints.is_external_name_service(&external_key);

        let ups = self.generate_upstream(
            owner,
            &upstream_name,
            upstream,
            is_external_name,
            endpoints,
            warnings,
        );
        upstream_configs.push(ups);
        cr_upstreams.insert(upstream_name.clone(), upstream.clone());

        if let Some(hc) = upstreams::generate_health_check(upstream, &upstream_name, &self.params)
        {
            health_checks.push(hc);
            let status_match = upstream
                .health_check
                .as_ref()
                .map(|hc| hc.status_match.as_str())
                .unwrap_or("");
            if !status_match.is_empty() {
                status_matches.push(upstreams::generate_upstream_status_match(
                    &upstream_name,
                    status_match,
                ));
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn lower_route(
        &self,
        route: &Route,
        upstream_namer: &UpstreamNamer,
        cr_upstreams: &HashMap<String, Upstream>,
        variable_namer: &VariableNamer,
        matches_routes: &mut usize,
        maps: &mut Vec<MapBlock>,
        split_clients: &mut Vec<SplitClient>,
        locations: &mut Vec<Location>,
        internal_redirect_locations: &mut Vec<InternalRedirectLocation>,
    ) {
        if !route.matches.is_empty() {
            let cfg = routing::generate_matches_config(
                route,
                upstream_namer,
                cr_upstreams,
                variable_namer,
                *matches_routes,
                split_clients.len(),
                &self.params,
            );

            maps.extend(cfg.maps);
            locations.extend(cfg.locations);
            internal_redirect_locations.push(cfg.internal_redirect_location);
            split_clients.extend(cfg.split_clients);

            *matches_routes += 1;
        } else if !route.splits.is_empty() {
            let cfg = routing::generate_default_splits_config(
                route,
                upstream_namer,
                cr_upstreams,
                variable_namer,
                split_clients.len(),
                &self.params,
            );

            split_clients.extend(cfg.split_clients);
            locations.extend(cfg.locations);
            internal_redirect_locations.push(cfg.internal_redirect_location);
        } else {
            let action = route.action.as_ref().expect("validated route has an action");
            let upstream_name = upstream_namer.name_for_upstream(&action.pass);
            let upstream = cr_upstreams.get(&upstream_name).cloned().unwrap_or_default();
            let loc = routing::generate_location(
                &route.path,
                &upstream_name,
                &upstream,
                action,
                &self.params,
            );
            locations.push(loc);
        }
    }
}

// ============================================================================
// SSL and TLS Redirect
// ============================================================================

pub(crate) fn generate_ssl_config(
    tls: Option<&Tls>,
    tls_pem_filename: &str,
    params: &ConfigParams,
) -> Option<Ssl> {
    let tls = tls?;

    if tls.secret.is_empty() {
        return None;
    }

    let (name, ciphers) = if tls_pem_filename.is_empty() {
        (MISSING_TLS_SECRET_PEM, "NULL")
    } else {
        (tls_pem_filename, "")
    };

    Some(Ssl {
        http2: params.http2,
        certificate: name.to_string(),
        certificate_key: name.to_string(),
        ciphers: ciphers.to_string(),
    })
}

pub(crate) fn generate_tls_redirect_config(tls: Option<&Tls>) -> Option<TlsRedirectConfig> {
    let redirect = tls?.redirect.as_ref()?;
    if !redirect.enable {
        return None;
    }

    Some(TlsRedirectConfig {
        code: redirect.code.unwrap_or(301),
        based_on: generate_tls_redirect_based_on(&redirect.based_on),
    })
}

fn generate_tls_redirect_based_on(based_on: &str) -> String {
    if based_on == "x-forwarded-proto" {
        return "$http_x_forwarded_proto".to_string();
    }
    "$scheme".to_string()
}

// ============================================================================
// Value-or-Default Helpers
// ============================================================================

pub(crate) fn string_or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        return default.to_string();
    }
    value.to_string()
}

pub(crate) fn int_or_default(value: Option<i32>, default: i32) -> i32 {
    value.unwrap_or(default)
}

pub(crate) fn bool_or_default(value: Option<bool>, default: bool) -> bool {
    value.unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================
