//! Resource validation
//!
//! This module provides total validation for VirtualServer and
//! VirtualServerRoute resources: every invariant violated by the input
//! contributes one field-path-tagged error, and a resource with no errors
//! is guaranteed safe to hand to the compiler.
//!
//! Validation never mutates its input and never stops at the first error.
//! Duplicated messages are reported once.
//!
//! # Module Organization
//!
//! - [`grammars`]: string grammars (names, paths, escaped strings, durations)
//! - [`lb`]: load-balancing method parsing
//! - `upstreams`: upstream rules and feature-tier gating
//! - `routes`: route, action, match and condition rules

pub mod grammars;
pub mod lb;
mod routes;
mod upstreams;

use std::collections::HashSet;
use std::fmt;
use tracing::{debug, trace};

use trellis_common::{Tier, TrellisError, TrellisResult};

use crate::resources::{Tls, TlsRedirect, VirtualServer, VirtualServerRoute};

pub(crate) use routes::validate_redirect_status_code;

// ============================================================================
// Error Model
// ============================================================================

/// Category of a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required field is missing or empty
    Required,
    /// A field value is malformed
    Invalid,
    /// A value collides with an earlier one
    Duplicate,
    /// A cross-reference points at a resource that does not exist
    NotFound,
    /// The field is not allowed in the current feature tier or position
    Forbidden,
}

/// A single validation failure, attached to the field that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidationError {
    pub kind: ErrorKind,
    /// Structured field path, e.g. `spec.routes[2].matches[0].conditions[1].header`
    pub path: String,
    /// The offending value, rendered for messages
    pub value: String,
    pub detail: String,
}

impl ValidationError {
    pub fn required(path: &FieldPath) -> Self {
        Self {
            kind: ErrorKind::Required,
            path: path.to_string(),
            value: String::new(),
            detail: String::new(),
        }
    }

    pub fn required_with_detail(path: &FieldPath, detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Required,
            path: path.to_string(),
            value: String::new(),
            detail: detail.into(),
        }
    }

    pub fn invalid(path: &FieldPath, value: impl fmt::Display, detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Invalid,
            path: path.to_string(),
            value: value.to_string(),
            detail: detail.into(),
        }
    }

    pub fn duplicate(path: &FieldPath, value: impl fmt::Display) -> Self {
        Self {
            kind: ErrorKind::Duplicate,
            path: path.to_string(),
            value: value.to_string(),
            detail: String::new(),
        }
    }

    pub fn not_found(path: &FieldPath, value: impl fmt::Display) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            path: path.to_string(),
            value: value.to_string(),
            detail: String::new(),
        }
    }

    pub fn forbidden(path: &FieldPath, detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Forbidden,
            path: path.to_string(),
            value: String::new(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::Required => {
                write!(f, "{}: Required value", self.path)?;
                if !self.detail.is_empty() {
                    write!(f, ": {}", self.detail)?;
                }
                Ok(())
            }
            ErrorKind::Invalid => {
                write!(f, "{}: Invalid value: {:?}: {}", self.path, self.value, self.detail)
            }
            ErrorKind::Duplicate => {
                write!(f, "{}: Duplicate value: {:?}", self.path, self.value)
            }
            ErrorKind::NotFound => {
                write!(f, "{}: Not found: {:?}", self.path, self.value)
            }
            ErrorKind::Forbidden => {
                write!(f, "{}: Forbidden: {}", self.path, self.detail)
            }
        }
    }
}

/// A structured path into a resource document.
#[derive(Debug, Clone)]
pub struct FieldPath {
    path: String,
}

impl FieldPath {
    pub fn new(root: &str) -> Self {
        Self { path: root.to_string() }
    }

    /// Append a named child: `spec` -> `spec.routes`
    pub fn child(&self, name: &str) -> Self {
        Self {
            path: format!("{}.{}", self.path, name),
        }
    }

    /// Append an index: `spec.routes` -> `spec.routes[2]`
    pub fn index(&self, index: usize) -> Self {
        Self {
            path: format!("{}[{}]", self.path, index),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// Drop exact duplicates while preserving first-occurrence order.
fn dedup_errors(errors: Vec<ValidationError>) -> Vec<ValidationError> {
    let mut seen = HashSet::new();
    errors
        .into_iter()
        .filter(|e| seen.insert(e.clone()))
        .collect()
}

// ============================================================================
// Entry Points
// ============================================================================

/// Validate a VirtualServer. Returns every violated invariant; an empty
/// list means the resource is safe to compile.
pub fn validate_virtual_server(vs: &VirtualServer, tier: Tier) -> Vec<ValidationError> {
    trace!(
        resource = %vs.resource_id(),
        upstreams = vs.spec.upstreams.len(),
        routes = vs.spec.routes.len(),
        "Validating VirtualServer"
    );

    let spec_path = FieldPath::new("spec");
    let mut errors = Vec::new();

    errors.extend(validate_host(&vs.spec.host, &spec_path.child("host")));
    errors.extend(validate_tls(vs.spec.tls.as_ref(), &spec_path.child("tls")));

    let (upstream_errors, upstream_names) =
        upstreams::validate_upstreams(&vs.spec.upstreams, &spec_path.child("upstreams"), tier);
    errors.extend(upstream_errors);

    errors.extend(routes::validate_virtual_server_routes(
        &vs.spec.routes,
        &spec_path.child("routes"),
        &upstream_names,
    ));

    let errors = dedup_errors(errors);
    debug!(
        resource = %vs.resource_id(),
        errors = errors.len(),
        "VirtualServer validation finished"
    );
    errors
}

/// Validate a VirtualServer, failing with a [`TrellisError`] carrying
/// every rendered message. Convenience for callers that treat a rejected
/// resource as an error rather than inspecting individual fields.
pub fn ensure_valid_virtual_server(vs: &VirtualServer, tier: Tier) -> TrellisResult<()> {
    let errors = validate_virtual_server(vs, tier);
    if errors.is_empty() {
        return Ok(());
    }
    Err(TrellisError::Validation {
        resource: vs.resource_id().to_string(),
        errors: errors.iter().map(|e| e.to_string()).collect(),
    })
}

/// Validate a VirtualServerRoute against its parent, failing with a
/// [`TrellisError`] carrying every rendered message.
pub fn ensure_valid_virtual_server_route(
    vsr: &VirtualServerRoute,
    virtual_server_host: &str,
    vs_path: &str,
    tier: Tier,
) -> TrellisResult<()> {
    let errors =
        validate_virtual_server_route_for_virtual_server(vsr, virtual_server_host, vs_path, tier);
    if errors.is_empty() {
        return Ok(());
    }
    Err(TrellisError::Validation {
        resource: vsr.resource_id().to_string(),
        errors: errors.iter().map(|e| e.to_string()).collect(),
    })
}

/// Validate a standalone VirtualServerRoute (no parent context).
pub fn validate_virtual_server_route(
    vsr: &VirtualServerRoute,
    tier: Tier,
) -> Vec<ValidationError> {
    validate_virtual_server_route_spec(vsr, "", "/", tier)
}

/// Validate a VirtualServerRoute against the VirtualServer that delegates
/// to it, represented by its host and referencing route path.
pub fn validate_virtual_server_route_for_virtual_server(
    vsr: &VirtualServerRoute,
    virtual_server_host: &str,
    vs_path: &str,
    tier: Tier,
) -> Vec<ValidationError> {
    validate_virtual_server_route_spec(vsr, virtual_server_host, vs_path, tier)
}

fn validate_virtual_server_route_spec(
    vsr: &VirtualServerRoute,
    virtual_server_host: &str,
    vs_path: &str,
    tier: Tier,
) -> Vec<ValidationError> {
    trace!(
        resource = %vsr.resource_id(),
        parent_host = virtual_server_host,
        parent_path = vs_path,
        "Validating VirtualServerRoute"
    );

    let spec_path = FieldPath::new("spec");
    let mut errors = Vec::new();

    errors.extend(validate_virtual_server_route_host(
        &vsr.spec.host,
        virtual_server_host,
        &spec_path.child("host"),
    ));

    let (upstream_errors, upstream_names) =
        upstreams::validate_upstreams(&vsr.spec.upstreams, &spec_path.child("upstreams"), tier);
    errors.extend(upstream_errors);

    errors.extend(routes::validate_virtual_server_route_subroutes(
        &vsr.spec.subroutes,
        &spec_path.child("subroutes"),
        &upstream_names,
        vs_path,
    ));

    let errors = dedup_errors(errors);
    debug!(
        resource = %vsr.resource_id(),
        errors = errors.len(),
        "VirtualServerRoute validation finished"
    );
    errors
}

// ============================================================================
// Host and TLS
// ============================================================================

fn validate_host(host: &str, path: &FieldPath) -> Vec<ValidationError> {
    if host.is_empty() {
        return vec![ValidationError::required(path)];
    }

    grammars::is_dns1123_subdomain(host)
        .into_iter()
        .map(|msg| ValidationError::invalid(path, host, msg))
        .collect()
}

fn validate_virtual_server_route_host(
    host: &str,
    virtual_server_host: &str,
    path: &FieldPath,
) -> Vec<ValidationError> {
    let mut errors = validate_host(host, path);

    if !virtual_server_host.is_empty() && host != virtual_server_host {
        errors.push(ValidationError::invalid(
            path,
            host,
            format!("must be equal to '{}'", virtual_server_host),
        ));
    }

    errors
}

fn validate_tls(tls: Option<&Tls>, path: &FieldPath) -> Vec<ValidationError> {
    let tls = match tls {
        Some(tls) => tls,
        // valid case - tls is not defined
        None => return vec![],
    };

    let mut errors = validate_secret_name(&tls.secret, &path.child("secret"));
    errors.extend(validate_tls_redirect(tls.redirect.as_ref(), &path.child("redirect")));
    errors
}

fn validate_tls_redirect(
    redirect: Option<&TlsRedirect>,
    path: &FieldPath,
) -> Vec<ValidationError> {
    let redirect = match redirect {
        Some(redirect) => redirect,
        None => return vec![],
    };

    let mut errors = Vec::new();

    if let Some(code) = redirect.code {
        errors.extend(validate_redirect_status_code(code, &path.child("code")));
    }

    if !redirect.based_on.is_empty()
        && redirect.based_on != "scheme"
        && redirect.based_on != "x-forwarded-proto"
    {
        errors.push(ValidationError::invalid(
            &path.child("basedOn"),
            &redirect.based_on,
            "accepted values are 'scheme', 'x-forwarded-proto'",
        ));
    }

    errors
}

/// An empty secret name is allowed; it disables TLS termination.
fn validate_secret_name(name: &str, path: &FieldPath) -> Vec<ValidationError> {
    if name.is_empty() {
        return vec![];
    }

    grammars::is_dns1123_subdomain(name)
        .into_iter()
        .map(|msg| ValidationError::invalid(path, name, msg))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Metadata, VirtualServerSpec};

    fn minimal_vs() -> VirtualServer {
        VirtualServer {
            metadata: Metadata {
                name: "cafe".to_string(),
                namespace: "default".to_string(),
            },
            spec: VirtualServerSpec {
                host: "cafe.example.com".to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_field_path_rendering() {
        let path = FieldPath::new("spec")
            .child("routes")
            .index(2)
            .child("matches")
            .index(0)
            .child("conditions")
            .index(1)
            .child("header");
        assert_eq!(path.to_string(), "spec.routes[2].matches[0].conditions[1].header");
    }

    #[test]
    fn test_error_display() {
        let path = FieldPath::new("spec").child("host");
        assert_eq!(
            ValidationError::required(&path).to_string(),
            "spec.host: Required value"
        );
        assert_eq!(
            ValidationError::invalid(&path, "Bad!", "must be lowercase").to_string(),
            "spec.host: Invalid value: \"Bad!\": must be lowercase"
        );
        assert_eq!(
            ValidationError::duplicate(&path, "tea").to_string(),
            "spec.host: Duplicate value: \"tea\""
        );
        assert_eq!(
            ValidationError::not_found(&path, "tea").to_string(),
            "spec.host: Not found: \"tea\""
        );
        assert_eq!(
            ValidationError::forbidden(&path, "not allowed").to_string(),
            "spec.host: Forbidden: not allowed"
        );
    }

    #[test]
    fn test_minimal_virtual_server_is_valid() {
        let vs = minimal_vs();
        assert!(validate_virtual_server(&vs, Tier::Oss).is_empty());
    }

    #[test]
    fn test_missing_host_is_required() {
        let mut vs = minimal_vs();
        vs.spec.host = String::new();
        let errors = validate_virtual_server(&vs, Tier::Oss);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Required);
        assert_eq!(errors[0].path, "spec.host");
    }

    #[test]
    fn test_invalid_host() {
        let mut vs = minimal_vs();
        vs.spec.host = "-bad.host".to_string();
        let errors = validate_virtual_server(&vs, Tier::Oss);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Invalid);
    }

    #[test]
    fn test_tls_redirect_based_on() {
        let mut vs = minimal_vs();
        vs.spec.tls = Some(Tls {
            secret: "cafe-secret".to_string(),
            redirect: Some(TlsRedirect {
                enable: true,
                code: Some(302),
                based_on: "x-forwarded-proto".to_string(),
            }),
        });
        assert!(validate_virtual_server(&vs, Tier::Oss).is_empty());

        vs.spec.tls.as_mut().unwrap().redirect.as_mut().unwrap().based_on =
            "referer".to_string();
        let errors = validate_virtual_server(&vs, Tier::Oss);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "spec.tls.redirect.basedOn");
    }

    #[test]
    fn test_tls_redirect_code() {
        let mut vs = minimal_vs();
        vs.spec.tls = Some(Tls {
            secret: "cafe-secret".to_string(),
            redirect: Some(TlsRedirect {
                enable: true,
                code: Some(200),
                based_on: String::new(),
            }),
        });
        let errors = validate_virtual_server(&vs, Tier::Oss);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "spec.tls.redirect.code");
    }

    #[test]
    fn test_invalid_tls_secret_name() {
        let mut vs = minimal_vs();
        vs.spec.tls = Some(Tls {
            secret: "Invalid Secret".to_string(),
            redirect: None,
        });
        let errors = validate_virtual_server(&vs, Tier::Oss);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "spec.tls.secret");
    }

    #[test]
    fn test_vsr_host_must_match_parent() {
        let vsr = VirtualServerRoute {
            metadata: Metadata {
                name: "coffee".to_string(),
                namespace: "default".to_string(),
            },
            spec: crate::resources::VirtualServerRouteSpec {
                host: "other.example.com".to_string(),
                ..Default::default()
            },
        };

        let errors = validate_virtual_server_route_for_virtual_server(
            &vsr,
            "cafe.example.com",
            "/coffee",
            Tier::Oss,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "spec.host");

        // standalone validation does not check the parent host
        assert!(validate_virtual_server_route(&vsr, Tier::Oss).is_empty());
    }

    #[test]
    fn test_ensure_valid_virtual_server() {
        let vs = minimal_vs();
        assert!(ensure_valid_virtual_server(&vs, Tier::Oss).is_ok());

        let mut bad = minimal_vs();
        bad.spec.host = String::new();
        let err = ensure_valid_virtual_server(&bad, Tier::Oss).unwrap_err();
        match err {
            TrellisError::Validation { resource, errors } => {
                assert_eq!(resource, "default/cafe");
                assert_eq!(errors, vec!["spec.host: Required value"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_duplicate_errors_reported_once() {
        let path = FieldPath::new("spec").child("host");
        let errors = dedup_errors(vec![
            ValidationError::required(&path),
            ValidationError::required(&path),
        ]);
        assert_eq!(errors.len(), 1);
    }
}
