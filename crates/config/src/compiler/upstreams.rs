//! Upstream lowering
//!
//! Resolves endpoints for each upstream, applies the value-or-fleet-default
//! rules to the tuning knobs, and produces the commercial-tier extras
//! (slow start, queue, session cookie, active health checks).

use tracing::debug;

use trellis_common::ResourceId;

use crate::compiler::{
    int_or_default, string_or_default, VirtualServerCompiler, VirtualServerEx, NGINX_502_SERVER,
};
use crate::model::{
    HealthCheckConfig, QueueConfig, SessionCookieConfig, StatusMatch, UpstreamConfig,
    UpstreamServer,
};
use crate::names;
use crate::params::ConfigParams;
use crate::resources::{SessionCookie, Upstream, UpstreamBuffers, UpstreamQueue};
use crate::warnings::Warnings;

/// LB methods slow start cannot be combined with; `hash` variants are
/// matched by prefix.
const SLOW_START_INCOMPATIBLE_LB_METHODS: &[&str] = &[
    "random",
    "ip_hash",
    "random two",
    "random two least_conn",
    "random two least_time=header",
    "random two least_time=last_byte",
];

impl VirtualServerCompiler {
    /// Resolve the endpoint list for an upstream.
    ///
    /// On the OSS tier a pool with no endpoints gets the unreachable
    /// sentinel server so the proxy answers 502. An ExternalName service
    /// without a configured resolver produces an empty list and a warning
    /// keyed by the owning resource.
    pub(crate) fn generate_endpoints_for_upstream(
        &self,
        owner: &ResourceId,
        namespace: &str,
        upstream: &Upstream,
        vs_ex: &VirtualServerEx,
        warnings: &mut Warnings,
    ) -> Vec<String> {
        let endpoints_key =
            names::endpoints_key(namespace, &upstream.service, &upstream.subselector, upstream.port);
        let external_key = names::external_name_service_key(namespace, &upstream.service);

        let endpoints = vs_ex.endpoints.endpoints_for(&endpoints_key).to_vec();
        if !self.tier().is_commercial() && endpoints.is_empty() {
            return vec![NGINX_502_SERVER.to_string()];
        }

        if vs_ex.endpoints.is_external_name_service(&external_key) && !self.resolver_configured() {
            warnings.add(
                owner.clone(),
                format!(
                    "Type ExternalName service {} in upstream {} will be ignored. To use \
                     ExternalName services, a resolver must be configured in the ConfigMap",
                    upstream.service, upstream.name
                ),
            );
            return vec![];
        }

        endpoints
    }

    /// Lower one upstream into its generated block.
    pub(crate) fn generate_upstream(
        &self,
        owner: &ResourceId,
        upstream_name: &str,
        upstream: &Upstream,
        is_external_name_svc: bool,
        endpoints: Vec<String>,
        warnings: &mut Warnings,
    ) -> UpstreamConfig {
        let servers = endpoints
            .into_iter()
            .map(|address| UpstreamServer { address })
            .collect();

        let params = self.params();
        let lb_method = generate_lb_method(&upstream.lb_method, &params.lb_method);

        let mut ups = UpstreamConfig {
            name: upstream_name.to_string(),
            servers,
            resolve: is_external_name_svc,
            lb_method: lb_method.clone(),
            keepalive: int_or_default(upstream.keepalive, params.keepalive),
            max_fails: int_or_default(upstream.max_fails, params.max_fails),
            fail_timeout: string_or_default(&upstream.fail_timeout, &params.fail_timeout),
            max_conns: int_or_default(upstream.max_conns, params.max_conns),
            upstream_zone_size: params.upstream_zone_size.clone(),
            ..Default::default()
        };

        if self.tier().is_commercial() {
            ups.slow_start = self.generate_slow_start(owner, upstream, &lb_method, warnings);
            ups.queue = generate_queue(upstream.queue.as_ref(), "60s");
            ups.session_cookie = generate_session_cookie(upstream.session_cookie.as_ref());
        }

        ups
    }

    /// Slow start is silently dropped (with a warning) when the effective
    /// LB method cannot support it.
    fn generate_slow_start(
        &self,
        owner: &ResourceId,
        upstream: &Upstream,
        lb_method: &str,
        warnings: &mut Warnings,
    ) -> String {
        if upstream.slow_start.is_empty() {
            return String::new();
        }

        let incompatible = SLOW_START_INCOMPATIBLE_LB_METHODS.contains(&lb_method)
            || lb_method.starts_with("hash");
        if incompatible {
            warnings.add(
                owner.clone(),
                format!(
                    "Slow start will be disabled for upstream {} because lb method '{}' is \
                     incompatible with slow start",
                    upstream.name, lb_method
                ),
            );
            return String::new();
        }

        upstream.slow_start.clone()
    }
}

// ============================================================================
// Field Lowering
// ============================================================================

/// `""` keeps the fleet default; `round_robin` maps to the empty string
/// because it is the proxy's own default; anything else passes through.
pub(crate) fn generate_lb_method(method: &str, default_method: &str) -> String {
    if method.is_empty() {
        return default_method.to_string();
    }
    if method == "round_robin" {
        return String::new();
    }
    method.to_string()
}

pub(crate) fn upstream_has_keepalive(upstream: &Upstream, params: &ConfigParams) -> bool {
    match upstream.keepalive {
        Some(keepalive) => keepalive != 0,
        None => params.keepalive != 0,
    }
}

pub(crate) fn generate_proxy_pass_protocol(enable_tls: bool) -> &'static str {
    if enable_tls {
        "https"
    } else {
        "http"
    }
}

pub(crate) fn generate_buffers(buffers: Option<&UpstreamBuffers>, default: &str) -> String {
    match buffers {
        Some(buffers) => format!("{} {}", buffers.number, buffers.size),
        None => default.to_string(),
    }
}

fn generate_queue(queue: Option<&UpstreamQueue>, default_timeout: &str) -> Option<QueueConfig> {
    let queue = queue?;
    Some(QueueConfig {
        size: queue.size,
        timeout: string_or_default(&queue.timeout, default_timeout),
    })
}

fn generate_session_cookie(sc: Option<&SessionCookie>) -> Option<SessionCookieConfig> {
    let sc = sc?;
    if !sc.enable {
        return None;
    }

    Some(SessionCookieConfig {
        enable: true,
        name: sc.name.clone(),
        path: sc.path.clone(),
        expires: sc.expires.clone(),
        domain: sc.domain.clone(),
        http_only: sc.http_only,
        secure: sc.secure,
    })
}

// ============================================================================
// Health Checks
// ============================================================================

fn health_check_with_defaults(
    upstream: &Upstream,
    upstream_name: &str,
    params: &ConfigParams,
) -> HealthCheckConfig {
    HealthCheckConfig {
        name: upstream_name.to_string(),
        uri: "/".to_string(),
        interval: "5s".to_string(),
        jitter: "0s".to_string(),
        fails: 1,
        passes: 1,
        port: upstream.port,
        proxy_pass: format!(
            "{}://{}",
            generate_proxy_pass_protocol(upstream.tls.enable),
            upstream_name
        ),
        proxy_connect_timeout: string_or_default(
            &upstream.proxy_connect_timeout,
            &params.proxy_connect_timeout,
        ),
        proxy_read_timeout: string_or_default(
            &upstream.proxy_read_timeout,
            &params.proxy_read_timeout,
        ),
        proxy_send_timeout: string_or_default(
            &upstream.proxy_send_timeout,
            &params.proxy_send_timeout,
        ),
        ..Default::default()
    }
}

/// Lower an active health check; `None` unless the upstream enables one.
/// Every explicit field overrides its default.
pub(crate) fn generate_health_check(
    upstream: &Upstream,
    upstream_name: &str,
    params: &ConfigParams,
) -> Option<HealthCheckConfig> {
    let hc = upstream.health_check.as_ref().filter(|hc| hc.enable)?;

    let mut check = health_check_with_defaults(upstream, upstream_name, params);

    if !hc.path.is_empty() {
        check.uri = hc.path.clone();
    }
    if !hc.interval.is_empty() {
        check.interval = hc.interval.clone();
    }
    if !hc.jitter.is_empty() {
        check.jitter = hc.jitter.clone();
    }
    if hc.fails > 0 {
        check.fails = hc.fails;
    }
    if hc.passes > 0 {
        check.passes = hc.passes;
    }
    if hc.port > 0 {
        check.port = hc.port as u16;
    }
    if !hc.connect_timeout.is_empty() {
        check.proxy_connect_timeout = hc.connect_timeout.clone();
    }
    if !hc.read_timeout.is_empty() {
        check.proxy_read_timeout = hc.read_timeout.clone();
    }
    if !hc.send_timeout.is_empty() {
        check.proxy_send_timeout = hc.send_timeout.clone();
    }

    for header in &hc.headers {
        check.headers.insert(header.name.clone(), header.value.clone());
    }

    if let Some(tls) = &hc.tls {
        check.proxy_pass = format!(
            "{}://{}",
            generate_proxy_pass_protocol(tls.enable),
            upstream_name
        );
    }

    if !hc.status_match.is_empty() {
        check.status_match = names::status_match_name(upstream_name);
    }

    Some(check)
}

pub(crate) fn generate_upstream_status_match(upstream_name: &str, status: &str) -> StatusMatch {
    StatusMatch {
        name: names::status_match_name(upstream_name),
        code: status.to_string(),
    }
}

// ============================================================================
// Commercial-Tier Upstream Pass
// ============================================================================

/// Per-upstream server tuning pushed over the management API when
/// endpoints change on the commercial tier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerTuning {
    pub max_fails: i32,
    pub fail_timeout: String,
    pub max_conns: i32,
    pub slow_start: String,
}

impl ServerTuning {
    /// Tuning view of a generated upstream; empty when the upstream has
    /// no servers to apply it to.
    pub fn from_upstream(upstream: &UpstreamConfig) -> Self {
        if upstream.servers.is_empty() {
            return Self::default();
        }
        Self {
            max_fails: upstream.max_fails,
            fail_timeout: upstream.fail_timeout.clone(),
            max_conns: upstream.max_conns,
            slow_start: upstream.slow_start.clone(),
        }
    }
}

/// Addresses of a lowered upstream, in server order.
pub fn endpoints_from_upstream(upstream: &UpstreamConfig) -> Vec<String> {
    upstream.servers.iter().map(|s| s.address.clone()).collect()
}

/// Generate only the upstream blocks of a bundle, for the commercial-tier
/// dynamic endpoint push. ExternalName services are skipped; their
/// endpoints are resolved by the proxy itself.
pub fn upstreams_for_commercial(
    vs_ex: &VirtualServerEx,
    base_params: &ConfigParams,
) -> Vec<UpstreamConfig> {
    let vs = &vs_ex.virtual_server;
    let compiler = VirtualServerCompiler::new(
        base_params.clone(),
        trellis_common::Tier::Commercial,
        false,
    );

    let mut upstreams = Vec::new();
    let mut warnings = Warnings::new();

    let vs_namer = crate::names::UpstreamNamer::for_virtual_server(vs);
    let vs_id = vs.resource_id();
    for u in &vs.spec.upstreams {
        let external_key =
            names::external_name_service_key(&vs.metadata.namespace, &u.service);
        if vs_ex.endpoints.is_external_name_service(&external_key) {
            debug!(
                service = %u.service,
                "Service is Type ExternalName, skipping endpoints update via management API"
            );
            continue;
        }

        let upstream_name = vs_namer.name_for_upstream(&u.name);
        let endpoints_key =
            names::endpoints_key(&vs.metadata.namespace, &u.service, &u.subselector, u.port);
        let endpoints = vs_ex.endpoints.endpoints_for(&endpoints_key).to_vec();

        upstreams.push(compiler.generate_upstream(
            &vs_id,
            &upstream_name,
            u,
            false,
            endpoints,
            &mut warnings,
        ));
    }

    for vsr in &vs_ex.virtual_server_routes {
        let vsr_namer = crate::names::UpstreamNamer::for_virtual_server_route(vs, vsr);
        let vsr_id = vsr.resource_id();
        for u in &vsr.spec.upstreams {
            let external_key =
                names::external_name_service_key(&vsr.metadata.namespace, &u.service);
            if vs_ex.endpoints.is_external_name_service(&external_key) {
                debug!(
                    service = %u.service,
                    "Service is Type ExternalName, skipping endpoints update via management API"
                );
                continue;
            }

            let upstream_name = vsr_namer.name_for_upstream(&u.name);
            let endpoints_key =
                names::endpoints_key(&vsr.metadata.namespace, &u.service, &u.subselector, u.port);
            let endpoints = vs_ex.endpoints.endpoints_for(&endpoints_key).to_vec();

            upstreams.push(compiler.generate_upstream(
                &vsr_id,
                &upstream_name,
                u,
                false,
                endpoints,
                &mut warnings,
            ));
        }
    }

    upstreams
}

// ============================================================================
// Tests
// ============================================================================
