//! Upstream validation
//!
//! Checks every tuning knob of an upstream, enforces name uniqueness
//! within the owning resource, and rejects commercial-tier fields when
//! validating for the OSS tier.

use std::collections::{HashMap, HashSet};

use trellis_common::Tier;

use crate::resources::{
    Header, HealthCheck, SessionCookie, Upstream, UpstreamBuffers, UpstreamQueue,
};
use crate::validation::{grammars, lb, FieldPath, ValidationError};

const NEXT_UPSTREAM_PARAMS: &[&str] = &[
    "error",
    "timeout",
    "invalid_header",
    "http_500",
    "http_502",
    "http_503",
    "http_504",
    "http_403",
    "http_404",
    "http_429",
    "non_idempotent",
    "off",
];

/// Validate a list of upstreams. Returns the errors plus the set of names
/// that later cross-reference checks (`pass` actions) resolve against.
pub(crate) fn validate_upstreams(
    upstreams: &[Upstream],
    path: &FieldPath,
    tier: Tier,
) -> (Vec<ValidationError>, HashSet<String>) {
    let mut errors = Vec::new();
    let mut upstream_names = HashSet::new();

    for (i, u) in upstreams.iter().enumerate() {
        let idx_path = path.index(i);

        let name_errors = validate_upstream_name(&u.name, &idx_path.child("name"));
        if !name_errors.is_empty() {
            errors.extend(name_errors);
        } else if upstream_names.contains(&u.name) {
            errors.push(ValidationError::duplicate(&idx_path.child("name"), &u.name));
        } else {
            upstream_names.insert(u.name.clone());
        }

        errors.extend(validate_service_name(&u.service, &idx_path.child("service")));
        errors.extend(validate_labels(&u.subselector, &idx_path.child("subselector")));
        errors.extend(time_errors(&u.proxy_connect_timeout, &idx_path.child("connect-timeout")));
        errors.extend(time_errors(&u.proxy_read_timeout, &idx_path.child("read-timeout")));
        errors.extend(time_errors(&u.proxy_send_timeout, &idx_path.child("send-timeout")));
        errors.extend(validate_next_upstream(
            &u.proxy_next_upstream,
            &idx_path.child("next-upstream"),
        ));
        errors.extend(time_errors(
            &u.proxy_next_upstream_timeout,
            &idx_path.child("next-upstream-timeout"),
        ));
        errors.extend(positive_int_or_zero(
            u.proxy_next_upstream_tries,
            &idx_path.child("next-upstream-tries"),
        ));
        errors.extend(validate_lb_method(&u.lb_method, &idx_path.child("lb-method"), tier));
        errors.extend(time_errors(&u.fail_timeout, &idx_path.child("fail-timeout")));
        errors.extend(positive_int_or_zero_from_option(
            u.max_fails,
            &idx_path.child("max-fails"),
        ));
        errors.extend(positive_int_or_zero_from_option(
            u.keepalive,
            &idx_path.child("keepalive"),
        ));
        errors.extend(positive_int_or_zero_from_option(
            u.max_conns,
            &idx_path.child("max-conns"),
        ));
        errors.extend(offset_errors(
            &u.client_max_body_size,
            &idx_path.child("client-max-body-size"),
        ));
        errors.extend(validate_health_check(
            u.health_check.as_ref(),
            &idx_path.child("healthCheck"),
        ));
        errors.extend(time_errors(&u.slow_start, &idx_path.child("slow-start")));
        errors.extend(validate_buffers(u.proxy_buffers.as_ref(), &idx_path.child("buffers")));
        errors.extend(size_errors(&u.proxy_buffer_size, &idx_path.child("buffer-size")));
        errors.extend(validate_queue(u.queue.as_ref(), &idx_path.child("queue")));
        errors.extend(validate_session_cookie(
            u.session_cookie.as_ref(),
            &idx_path.child("sessionCookie"),
        ));

        for msg in grammars::is_valid_port(i32::from(u.port)) {
            errors.push(ValidationError::invalid(&idx_path.child("port"), u.port, msg));
        }

        errors.extend(reject_commercial_fields_in_oss(u, &idx_path, tier));
    }

    (errors, upstream_names)
}

/// The proxy accepts looser upstream names, but enforcing a DNS-1035
/// label keeps them usable in generated identifiers.
pub(crate) fn validate_upstream_name(name: &str, path: &FieldPath) -> Vec<ValidationError> {
    validate_dns1035_label(name, path)
}

fn validate_service_name(name: &str, path: &FieldPath) -> Vec<ValidationError> {
    validate_dns1035_label(name, path)
}

fn validate_dns1035_label(name: &str, path: &FieldPath) -> Vec<ValidationError> {
    if name.is_empty() {
        return vec![ValidationError::required(path)];
    }

    grammars::is_dns1035_label(name)
        .into_iter()
        .map(|msg| ValidationError::invalid(path, name, msg))
        .collect()
}

fn validate_labels(
    labels: &HashMap<String, String>,
    path: &FieldPath,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    // Deterministic error order regardless of map iteration.
    let mut keys: Vec<&String> = labels.keys().collect();
    keys.sort();

    for name in keys {
        for msg in grammars::is_qualified_name(name) {
            errors.push(ValidationError::invalid(path, name, msg));
        }
        for msg in grammars::is_valid_label_value(&labels[name]) {
            errors.push(ValidationError::invalid(path, &labels[name], msg));
        }
    }

    errors
}

fn validate_next_upstream(next_upstream: &str, path: &FieldPath) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for param in next_upstream.split_whitespace() {
        if !NEXT_UPSTREAM_PARAMS.contains(&param) {
            errors.push(ValidationError::invalid(path, param, "not a valid parameter"));
        }
        if !seen.insert(param) {
            errors.push(ValidationError::invalid(
                path,
                param,
                "can not have duplicate parameters",
            ));
        }
    }

    errors
}

fn validate_lb_method(method: &str, path: &FieldPath, tier: Tier) -> Vec<ValidationError> {
    if method.is_empty() {
        return vec![];
    }

    match lb::parse_lb_method(method, tier) {
        Ok(_) => vec![],
        Err(msg) => vec![ValidationError::invalid(path, method, msg)],
    }
}

// ============================================================================
// Health Checks
// ============================================================================

fn validate_health_check(hc: Option<&HealthCheck>, path: &FieldPath) -> Vec<ValidationError> {
    let hc = match hc {
        Some(hc) => hc,
        None => return vec![],
    };

    let mut errors = Vec::new();

    if !hc.path.is_empty() {
        for msg in grammars::is_valid_path(&hc.path) {
            errors.push(ValidationError::invalid(&path.child("path"), &hc.path, msg));
        }
    }

    errors.extend(time_errors(&hc.interval, &path.child("interval")));
    errors.extend(time_errors(&hc.jitter, &path.child("jitter")));
    errors.extend(positive_int_or_zero(hc.fails, &path.child("fails")));
    errors.extend(positive_int_or_zero(hc.passes, &path.child("passes")));
    errors.extend(time_errors(&hc.connect_timeout, &path.child("connect-timeout")));
    errors.extend(time_errors(&hc.read_timeout, &path.child("read-timeout")));
    errors.extend(time_errors(&hc.send_timeout, &path.child("send-timeout")));

    if !hc.status_match.is_empty() {
        for msg in grammars::validate_status_match(&hc.status_match) {
            errors.push(ValidationError::invalid(
                &path.child("statusMatch"),
                &hc.status_match,
                msg,
            ));
        }
    }

    for (i, header) in hc.headers.iter().enumerate() {
        errors.extend(validate_header(header, &path.child("headers").index(i)));
    }

    // Port 0 means "use the upstream port".
    if hc.port > 0 {
        for msg in grammars::is_valid_port(hc.port) {
            errors.push(ValidationError::invalid(&path.child("port"), hc.port, msg));
        }
    }

    errors
}

fn validate_header(header: &Header, path: &FieldPath) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if header.name.is_empty() {
        errors.push(ValidationError::required(&path.child("name")));
    } else {
        for msg in grammars::is_http_header_name(&header.name) {
            errors.push(ValidationError::invalid(&path.child("name"), &header.name, msg));
        }
    }

    for msg in grammars::is_valid_header_value(&header.value) {
        errors.push(ValidationError::invalid(&path.child("value"), &header.value, msg));
    }

    errors
}

// ============================================================================
// Session Cookies, Queues and Buffers
// ============================================================================

fn validate_session_cookie(
    sc: Option<&SessionCookie>,
    path: &FieldPath,
) -> Vec<ValidationError> {
    let sc = match sc {
        Some(sc) => sc,
        None => return vec![],
    };

    let mut errors = Vec::new();

    if sc.name.is_empty() {
        errors.push(ValidationError::required(&path.child("name")));
    } else {
        for msg in grammars::is_cookie_name(&sc.name) {
            errors.push(ValidationError::invalid(&path.child("name"), &sc.name, msg));
        }
    }

    if !sc.path.is_empty() {
        for msg in grammars::is_valid_path(&sc.path) {
            errors.push(ValidationError::invalid(&path.child("path"), &sc.path, msg));
        }
    }

    // The literal `max` means "never expires".
    if sc.expires != "max" {
        errors.extend(time_errors(&sc.expires, &path.child("expires")));
    }

    if !sc.domain.is_empty() {
        // A domain prefix of "." is allowed.
        let domain = sc.domain.strip_prefix('.').unwrap_or(&sc.domain);
        for msg in grammars::is_dns1123_subdomain(domain) {
            errors.push(ValidationError::invalid(&path.child("domain"), &sc.domain, msg));
        }
    }

    errors
}

fn validate_queue(queue: Option<&UpstreamQueue>, path: &FieldPath) -> Vec<ValidationError> {
    let queue = match queue {
        Some(queue) => queue,
        None => return vec![],
    };

    let mut errors = time_errors(&queue.timeout, &path.child("timeout"));
    if queue.size <= 0 {
        errors.push(ValidationError::required_with_detail(
            &path.child("size"),
            "must be positive",
        ));
    }
    errors
}

fn validate_buffers(
    buffers: Option<&UpstreamBuffers>,
    path: &FieldPath,
) -> Vec<ValidationError> {
    let buffers = match buffers {
        Some(buffers) => buffers,
        None => return vec![],
    };

    let mut errors = Vec::new();

    if buffers.number <= 0 {
        errors.push(ValidationError::invalid(
            &path.child("number"),
            buffers.number,
            "must be positive",
        ));
    }

    if buffers.size.is_empty() {
        errors.push(ValidationError::required_with_detail(
            &path.child("size"),
            "cannot be empty",
        ));
    } else {
        errors.extend(size_errors(&buffers.size, &path.child("size")));
    }

    errors
}

// ============================================================================
// Feature-Tier Gating
// ============================================================================

fn reject_commercial_fields_in_oss(
    upstream: &Upstream,
    idx_path: &FieldPath,
    tier: Tier,
) -> Vec<ValidationError> {
    if tier.is_commercial() {
        return vec![];
    }

    let mut errors = Vec::new();

    if upstream.health_check.is_some() {
        errors.push(ValidationError::forbidden(
            &idx_path.child("healthCheck"),
            "active health checks are only supported in the commercial tier",
        ));
    }

    if !upstream.slow_start.is_empty() {
        errors.push(ValidationError::forbidden(
            &idx_path.child("slow-start"),
            "slow start is only supported in the commercial tier",
        ));
    }

    if upstream.session_cookie.is_some() {
        errors.push(ValidationError::forbidden(
            &idx_path.child("sessionCookie"),
            "sticky cookies are only supported in the commercial tier",
        ));
    }

    if upstream.queue.is_some() {
        errors.push(ValidationError::forbidden(
            &idx_path.child("queue"),
            "queue is only supported in the commercial tier",
        ));
    }

    errors
}

// ============================================================================
// Shared Helpers
// ============================================================================

fn time_errors(value: &str, path: &FieldPath) -> Vec<ValidationError> {
    grammars::is_valid_time(value)
        .into_iter()
        .map(|msg| ValidationError::invalid(path, value, msg))
        .collect()
}

fn offset_errors(value: &str, path: &FieldPath) -> Vec<ValidationError> {
    grammars::is_valid_offset(value)
        .into_iter()
        .map(|msg| ValidationError::invalid(path, value, msg))
        .collect()
}

fn size_errors(value: &str, path: &FieldPath) -> Vec<ValidationError> {
    grammars::is_valid_size(value)
        .into_iter()
        .map(|msg| ValidationError::invalid(path, value, msg))
        .collect()
}

fn positive_int_or_zero(n: i32, path: &FieldPath) -> Vec<ValidationError> {
    if n < 0 {
        return vec![ValidationError::invalid(path, n, "must be positive or zero")];
    }
    vec![]
}

fn positive_int_or_zero_from_option(n: Option<i32>, path: &FieldPath) -> Vec<ValidationError> {
    match n {
        Some(n) => positive_int_or_zero(n, path),
        None => vec![],
    }
}

// ============================================================================
// Tests
// ============================================================================
