//! Route, action, match and condition validation
//!
//! Enforces the exactly-one-of rules (action/splits/route on a route,
//! pass/redirect/return on an action, header/cookie/argument/variable on
//! a condition), the variable whitelists for redirect URLs and return
//! bodies, split weight arithmetic, and the coupling rules between a
//! VirtualServerRoute's subroutes and the VirtualServer path that
//! delegates to it.

use std::collections::HashSet;

use crate::resources::{Action, ActionRedirect, ActionReturn, Condition, Match, Route, Split};
use crate::validation::{grammars, FieldPath, ValidationError};

// ============================================================================
// Variable Whitelists
// ============================================================================

/// NGINX variables allowed in a condition's `variable` field.
const CONDITION_VARIABLES: &[&str] = &[
    "$args",
    "$http2",
    "$https",
    "$remote_addr",
    "$remote_port",
    "$query_string",
    "$request",
    "$request_body",
    "$request_uri",
    "$request_method",
    "$scheme",
];

/// NGINX variables allowed in a redirect URL.
const REDIRECT_VARIABLES: &[&str] = &["scheme", "http_x_forwarded_proto", "request_uri", "host"];

/// NGINX variables allowed in a return body.
const RETURN_BODY_VARIABLES: &[&str] = &[
    "request_uri",
    "request_method",
    "request_body",
    "scheme",
    "args",
    "host",
    "request_time",
    "request_length",
    "nginx_version",
    "pid",
    "connection",
    "remote_addr",
    "remote_port",
    "time_iso8601",
    "time_local",
    "server_addr",
    "server_port",
    "server_name",
    "server_protocol",
    "connections_active",
    "connections_reading",
    "connections_writing",
    "connections_waiting",
];

/// Variable families allowed in a return body; the suffix is validated
/// against the matching name grammar.
const RETURN_BODY_SPECIAL_VARIABLES: &[&str] = &["arg_", "http_", "cookie_"];

// ============================================================================
// Routes
// ============================================================================

pub(crate) fn validate_virtual_server_routes(
    routes: &[Route],
    path: &FieldPath,
    upstream_names: &HashSet<String>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut all_paths = HashSet::new();

    for (i, route) in routes.iter().enumerate() {
        let idx_path = path.index(i);

        let route_errors = validate_route(route, &idx_path, upstream_names, false);
        if !route_errors.is_empty() {
            errors.extend(route_errors);
        } else if all_paths.contains(&route.path) {
            errors.push(ValidationError::duplicate(&idx_path.child("path"), &route.path));
        } else {
            all_paths.insert(route.path.clone());
        }
    }

    errors
}

fn validate_route(
    route: &Route,
    path: &FieldPath,
    upstream_names: &HashSet<String>,
    is_route_field_forbidden: bool,
) -> Vec<ValidationError> {
    let mut errors = validate_route_path(&route.path, &path.child("path"));

    let mut field_count = 0;

    if let Some(action) = &route.action {
        errors.extend(validate_action(action, &path.child("action"), upstream_names));
        field_count += 1;
    }

    if !route.splits.is_empty() {
        errors.extend(validate_splits(&route.splits, &path.child("splits"), upstream_names));
        field_count += 1;
    }

    // Matches are a guard on top of the default action/splits, not one of
    // the exactly-one-of fields.
    for (i, m) in route.matches.iter().enumerate() {
        errors.extend(validate_match(m, &path.child("matches").index(i), upstream_names));
    }

    if !route.route.is_empty() {
        if is_route_field_forbidden {
            errors.push(ValidationError::forbidden(&path.child("route"), "is not allowed"));
        } else {
            errors.extend(validate_route_field(&route.route, &path.child("route")));
            field_count += 1;
        }
    }

    if field_count != 1 {
        let msg = if is_route_field_forbidden || !route.matches.is_empty() {
            "must specify exactly one of `action` or `splits`"
        } else {
            "must specify exactly one of `action`, `splits` or `route`"
        };
        errors.push(ValidationError::invalid(path, "", msg));
    }

    errors
}

fn validate_route_field(value: &str, path: &FieldPath) -> Vec<ValidationError> {
    grammars::is_qualified_name(value)
        .into_iter()
        .map(|msg| ValidationError::invalid(path, value, msg))
        .collect()
}

// ============================================================================
// Paths
// ============================================================================

/// Prefix locations, positive case-sensitive/insensitive regular
/// expression matches, and exact matches are supported.
fn validate_route_path(path_value: &str, path: &FieldPath) -> Vec<ValidationError> {
    if path_value.is_empty() {
        return vec![ValidationError::required(path)];
    }

    if path_value.starts_with('~') {
        validate_regex_path(path_value, path)
    } else if path_value.starts_with('/') {
        validate_prefix_path(path_value, path)
    } else if let Some(stripped) = path_value.strip_prefix('=') {
        validate_prefix_path(stripped, path)
    } else {
        vec![ValidationError::invalid(
            path,
            path_value,
            "must start with /, ~ or =",
        )]
    }
}

fn validate_regex_path(path_value: &str, path: &FieldPath) -> Vec<ValidationError> {
    let pattern = path_value
        .strip_prefix("~*")
        .or_else(|| path_value.strip_prefix('~'))
        .unwrap_or(path_value)
        .trim_start_matches(' ');

    if let Err(err) = regex::Regex::new(pattern) {
        return vec![ValidationError::invalid(
            path,
            path_value,
            format!("must be a valid regular expression: {}", err),
        )];
    }

    if !grammars::is_escaped_string(path_value) {
        return vec![ValidationError::invalid(
            path,
            path_value,
            grammars::ESCAPED_STRING_ERR_MSG,
        )];
    }

    vec![]
}

fn validate_prefix_path(path_value: &str, path: &FieldPath) -> Vec<ValidationError> {
    if path_value.is_empty() {
        return vec![ValidationError::required(path)];
    }

    grammars::is_valid_path(path_value)
        .into_iter()
        .map(|msg| ValidationError::invalid(path, path_value, msg))
        .collect()
}

fn is_regex_or_exact_match(path: &str) -> bool {
    path.starts_with('~') || path.starts_with('=')
}

// ============================================================================
// Actions
// ============================================================================

fn count_actions(action: &Action) -> usize {
    let mut count = 0;
    if !action.pass.is_empty() {
        count += 1;
    }
    if action.redirect.is_some() {
        count += 1;
    }
    if action.return_.is_some() {
        count += 1;
    }
    count
}

fn validate_action(
    action: &Action,
    path: &FieldPath,
    upstream_names: &HashSet<String>,
) -> Vec<ValidationError> {
    if count_actions(action) != 1 {
        return vec![ValidationError::required_with_detail(
            path,
            "action must specify exactly one of `pass`, `redirect` or `return`",
        )];
    }

    let mut errors = Vec::new();

    if !action.pass.is_empty() {
        errors.extend(validate_referenced_upstream(
            &action.pass,
            &path.child("pass"),
            upstream_names,
        ));
    }

    if let Some(redirect) = &action.redirect {
        errors.extend(validate_action_redirect(redirect, &path.child("redirect")));
    }

    if let Some(ret) = &action.return_ {
        errors.extend(validate_action_return(ret, &path.child("return")));
    }

    errors
}

fn validate_referenced_upstream(
    name: &str,
    path: &FieldPath,
    upstream_names: &HashSet<String>,
) -> Vec<ValidationError> {
    let name_errors = super::upstreams::validate_upstream_name(name, path);
    if !name_errors.is_empty() {
        return name_errors;
    }
    if !upstream_names.contains(name) {
        return vec![ValidationError::not_found(path, name)];
    }
    vec![]
}

// ============================================================================
// Redirects
// ============================================================================

fn validate_action_redirect(
    redirect: &ActionRedirect,
    path: &FieldPath,
) -> Vec<ValidationError> {
    let mut errors = validate_redirect_url(&redirect.url, &path.child("url"));

    if let Some(code) = redirect.code {
        errors.extend(validate_redirect_status_code(code, &path.child("code")));
    }

    errors
}

pub(crate) fn validate_redirect_status_code(code: u16, path: &FieldPath) -> Vec<ValidationError> {
    const REDIRECT_CODES: &[u16] = &[301, 302, 307, 308];

    if !REDIRECT_CODES.contains(&code) {
        return vec![ValidationError::invalid(
            path,
            code,
            "status code out of accepted range. accepted values are '301', '302', '307', '308'",
        )];
    }
    vec![]
}

fn validate_redirect_url(url: &str, path: &FieldPath) -> Vec<ValidationError> {
    if url.is_empty() {
        return vec![ValidationError::required_with_detail(path, "must specify a url")];
    }

    if !grammars::is_escaped_string(url) {
        return vec![ValidationError::invalid(
            path,
            url,
            grammars::ESCAPED_STRING_ERR_MSG,
        )];
    }

    validate_string_with_variables(url, path, REDIRECT_VARIABLES, &[])
}

// ============================================================================
// Returns
// ============================================================================

fn validate_action_return(ret: &ActionReturn, path: &FieldPath) -> Vec<ValidationError> {
    if ret.body.is_empty() {
        return vec![ValidationError::required(&path.child("body"))];
    }

    let mut errors = validate_action_return_body(&ret.body, &path.child("body"));

    if !ret.type_.is_empty() {
        for msg in grammars::is_valid_return_type(&ret.type_) {
            errors.push(ValidationError::invalid(&path.child("type"), &ret.type_, msg));
        }
    }

    if let Some(code) = ret.code {
        errors.extend(validate_action_return_code(code, &path.child("code")));
    }

    errors
}

fn validate_action_return_code(code: u16, path: &FieldPath) -> Vec<ValidationError> {
    if (200..=299).contains(&code) || (400..=599).contains(&code) {
        return vec![];
    }

    vec![ValidationError::invalid(
        path,
        code,
        "must be a valid status code either 2XX, 4XX or 5XX, for example, 200 or 402",
    )]
}

fn validate_action_return_body(body: &str, path: &FieldPath) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !grammars::is_escaped_string(body) {
        errors.push(ValidationError::invalid(
            path,
            body,
            grammars::ESCAPED_STRING_ERR_MSG,
        ));
    }

    errors.extend(validate_string_with_variables(
        body,
        path,
        RETURN_BODY_VARIABLES,
        RETURN_BODY_SPECIAL_VARIABLES,
    ));

    errors
}

// ============================================================================
// Variable Syntax
// ============================================================================

fn validate_string_with_variables(
    value: &str,
    path: &FieldPath,
    valid_vars: &[&str],
    special_vars: &[&str],
) -> Vec<ValidationError> {
    if value.ends_with('$') {
        return vec![ValidationError::invalid(path, value, "must not end with $")];
    }

    let bytes = value.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'$' {
            let msg = "variables must be enclosed in curly braces, for example ${host}";
            if bytes[i + 1] != b'{' {
                return vec![ValidationError::invalid(path, value, msg)];
            }
            if !value[i + 1..].contains('}') {
                return vec![ValidationError::invalid(path, value, msg)];
            }
        }
    }

    let mut errors = Vec::new();

    for var in grammars::capture_variables(value) {
        let special = special_vars.iter().any(|prefix| var.starts_with(prefix));
        if special {
            errors.extend(validate_special_variable(var, path));
        } else if !valid_vars.contains(&var) {
            errors.push(ValidationError::invalid(
                path,
                var,
                format!(
                    "'{}' contains an invalid NGINX variable. Accepted variables are: {}",
                    var,
                    valid_vars.join(", ")
                ),
            ));
        }
    }

    errors
}

fn validate_special_variable(var: &str, path: &FieldPath) -> Vec<ValidationError> {
    let (family, name) = match var.split_once('_') {
        Some(parts) => parts,
        None => return vec![],
    };

    let msgs = match family {
        "arg" => grammars::is_argument_name(name),
        "http" => is_valid_special_variable_header(name),
        "cookie" => grammars::is_cookie_name(name),
        _ => vec![],
    };

    msgs.into_iter()
        .map(|msg| ValidationError::invalid(path, var, msg))
        .collect()
}

/// Underscores in an `http_` variable represent `-` in the original
/// header name, so the decoded name must be a valid header with no
/// remaining `-`.
fn is_valid_special_variable_header(header: &str) -> Vec<String> {
    let decoded = header.replace('_', "-");
    if !grammars::is_http_header_name(&decoded).is_empty() || header.contains('-') {
        return vec![
            "a valid HTTP header must consist of alphanumeric characters or '_'".to_string(),
        ];
    }
    vec![]
}

// ============================================================================
// Splits
// ============================================================================

fn validate_splits(
    splits: &[Split],
    path: &FieldPath,
    upstream_names: &HashSet<String>,
) -> Vec<ValidationError> {
    if splits.len() < 2 {
        return vec![ValidationError::invalid(path, "", "must include at least 2 splits")];
    }

    let mut errors = Vec::new();
    let mut total_weight = 0;

    for (i, split) in splits.iter().enumerate() {
        let idx_path = path.index(i);

        if !(1..=99).contains(&split.weight) {
            errors.push(ValidationError::invalid(
                &idx_path.child("weight"),
                split.weight,
                "must be between 1 and 99, inclusive",
            ));
        }

        match &split.action {
            Some(action) => {
                errors.extend(validate_action(action, &idx_path.child("action"), upstream_names));
            }
            None => errors.push(ValidationError::required(&idx_path.child("action"))),
        }

        total_weight += split.weight;
    }

    if total_weight != 100 {
        errors.push(ValidationError::invalid(
            path,
            "",
            "the sum of the weights of all splits must be equal to 100",
        ));
    }

    errors
}

// ============================================================================
// Matches and Conditions
// ============================================================================

fn validate_match(
    m: &Match,
    path: &FieldPath,
    upstream_names: &HashSet<String>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if m.conditions.is_empty() {
        errors.push(ValidationError::required_with_detail(
            &path.child("conditions"),
            "must specify at least one condition",
        ));
    } else {
        for (i, condition) in m.conditions.iter().enumerate() {
            errors.extend(validate_condition(condition, &path.child("conditions").index(i)));
        }
    }

    let mut field_count = 0;

    if let Some(action) = &m.action {
        errors.extend(validate_action(action, &path.child("action"), upstream_names));
        field_count += 1;
    }

    if !m.splits.is_empty() {
        errors.extend(validate_splits(&m.splits, &path.child("splits"), upstream_names));
        field_count += 1;
    }

    if field_count != 1 {
        errors.push(ValidationError::invalid(
            path,
            "",
            "must specify exactly one of `action` or `splits`",
        ));
    }

    errors
}

fn validate_condition(condition: &Condition, path: &FieldPath) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut field_count = 0;

    if !condition.header.is_empty() {
        for msg in grammars::is_http_header_name(&condition.header) {
            errors.push(ValidationError::invalid(&path.child("header"), &condition.header, msg));
        }
        field_count += 1;
    }

    if !condition.cookie.is_empty() {
        for msg in grammars::is_cookie_name(&condition.cookie) {
            errors.push(ValidationError::invalid(&path.child("cookie"), &condition.cookie, msg));
        }
        field_count += 1;
    }

    if !condition.argument.is_empty() {
        for msg in grammars::is_argument_name(&condition.argument) {
            errors.push(ValidationError::invalid(
                &path.child("argument"),
                &condition.argument,
                msg,
            ));
        }
        field_count += 1;
    }

    if !condition.variable.is_empty() {
        errors.extend(validate_variable_name(&condition.variable, &path.child("variable")));
        field_count += 1;
    }

    if field_count != 1 {
        errors.push(ValidationError::invalid(
            path,
            "",
            "must specify exactly one of: `header`, `cookie`, `argument` or `variable`",
        ));
    }

    for msg in grammars::is_valid_match_value(&condition.value) {
        errors.push(ValidationError::invalid(&path.child("value"), &condition.value, msg));
    }

    errors
}

fn validate_variable_name(name: &str, path: &FieldPath) -> Vec<ValidationError> {
    if !name.starts_with('$') {
        return vec![ValidationError::invalid(path, name, "must start with `$`")];
    }

    if !CONDITION_VARIABLES.contains(&name) {
        return vec![ValidationError::invalid(
            path,
            name,
            "is not allowed or is not an NGINX variable",
        )];
    }

    vec![]
}

// ============================================================================
// VirtualServerRoute Subroutes
// ============================================================================

pub(crate) fn validate_virtual_server_route_subroutes(
    routes: &[Route],
    path: &FieldPath,
    upstream_names: &HashSet<String>,
    vs_path: &str,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut all_paths = HashSet::new();

    if is_regex_or_exact_match(vs_path) {
        if routes.len() != 1 {
            return vec![ValidationError::invalid(
                path,
                "subroutes",
                "must have only one subroute if regex match or exact match are being used",
            )];
        }

        let idx_path = path.index(0);
        if routes[0].path != vs_path {
            return vec![ValidationError::invalid(
                &idx_path.child("path"),
                &routes[0].path,
                "must have the same path as the referenced VirtualServer route path",
            )];
        }

        return validate_route(&routes[0], &idx_path, upstream_names, true);
    }

    for (i, route) in routes.iter().enumerate() {
        let idx_path = path.index(i);

        let mut route_errors = validate_route(route, &idx_path, upstream_names, true);

        if !vs_path.is_empty()
            && !route.path.starts_with(vs_path)
            && !is_regex_or_exact_match(&route.path)
        {
            route_errors.push(ValidationError::invalid(
                &idx_path,
                &route.path,
                format!("must start with '{}'", vs_path),
            ));
        }

        if !route_errors.is_empty() {
            errors.extend(route_errors);
        } else if all_paths.contains(&route.path) {
            errors.push(ValidationError::duplicate(&idx_path.child("path"), &route.path));
        } else {
            all_paths.insert(route.path.clone());
        }
    }

    errors
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ErrorKind;

    fn names(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn pass(upstream: &str) -> Action {
        Action {
            pass: upstream.to_string(),
            ..Default::default()
        }
    }

    fn root() -> FieldPath {
        FieldPath::new("spec").child("routes")
    }

    #[test]
    fn test_valid_plain_route() {
        let routes = vec![Route {
            path: "/tea".to_string(),
            action: Some(pass("tea")),
            ..Default::default()
        }];
        let errors = validate_virtual_server_routes(&routes, &root(), &names(&["tea"]));
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_duplicate_route_paths() {
        let route = Route {
            path: "/tea".to_string(),
            action: Some(pass("tea")),
            ..Default::default()
        };
        let routes = vec![route.clone(), route];
        let errors = validate_virtual_server_routes(&routes, &root(), &names(&["tea"]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Duplicate);
        assert_eq!(errors[0].path, "spec.routes[1].path");
    }

    #[test]
    fn test_route_requires_exactly_one_field() {
        let routes = vec![Route {
            path: "/tea".to_string(),
            ..Default::default()
        }];
        let errors = validate_virtual_server_routes(&routes, &root(), &names(&[]));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].detail.contains("`action`, `splits` or `route`"));

        let routes = vec![Route {
            path: "/tea".to_string(),
            action: Some(pass("tea")),
            route: "default/coffee".to_string(),
            ..Default::default()
        }];
        let errors = validate_virtual_server_routes(&routes, &root(), &names(&["tea"]));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_route_paths() {
        for path in ["/", "/tea", "=/tea", "~ ^/tea/.*", "~* ^/tea$"] {
            let errors = validate_route_path(path, &root().index(0).child("path"));
            assert!(errors.is_empty(), "{}: {:?}", path, errors);
        }
        for path in ["", "tea", "/tea{bad}", "/tea bad", "~ [unclosed"] {
            let errors = validate_route_path(path, &root().index(0).child("path"));
            assert!(!errors.is_empty(), "{} should be invalid", path);
        }
    }

    #[test]
    fn test_action_exactly_one_of() {
        let action = Action::default();
        let errors = validate_action(&action, &root().index(0).child("action"), &names(&[]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Required);

        let action = Action {
            pass: "tea".to_string(),
            redirect: Some(ActionRedirect {
                url: "http://nginx.org".to_string(),
                code: None,
            }),
            return_: None,
        };
        let errors = validate_action(&action, &root().index(0).child("action"), &names(&["tea"]));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_pass_must_reference_existing_upstream() {
        let errors = validate_action(
            &pass("missing"),
            &root().index(0).child("action"),
            &names(&["tea"]),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_redirect_url_variables() {
        let path = root().index(0).child("action").child("redirect").child("url");

        for url in [
            "http://www.nginx.com",
            "${scheme}://${host}/green/",
            "${http_x_forwarded_proto}://example.com${request_uri}",
        ] {
            assert!(validate_redirect_url(url, &path).is_empty(), "{}", url);
        }

        // variable not in the redirect whitelist
        assert!(!validate_redirect_url("${request_method}://x", &path).is_empty());
        // bad variable syntax
        assert!(!validate_redirect_url("http://x.com/$scheme", &path).is_empty());
        assert!(!validate_redirect_url("http://x.com/${scheme", &path).is_empty());
        assert!(!validate_redirect_url("http://x.com$", &path).is_empty());
        // unescaped quote
        assert!(!validate_redirect_url(r#"http://"x""#, &path).is_empty());
        // empty
        assert!(!validate_redirect_url("", &path).is_empty());
    }

    #[test]
    fn test_redirect_codes() {
        let path = root().index(0).child("action").child("redirect").child("code");
        for code in [301u16, 302, 307, 308] {
            assert!(validate_redirect_status_code(code, &path).is_empty());
        }
        for code in [200u16, 303, 400] {
            assert!(!validate_redirect_status_code(code, &path).is_empty());
        }
    }

    #[test]
    fn test_return_body_and_code() {
        let path = root().index(0).child("action").child("return");

        let ret = ActionReturn {
            code: Some(200),
            type_: "application/json".to_string(),
            body: r#"{\"status\": \"ok\", \"host\": \"${host}\"}"#.to_string(),
        };
        assert!(validate_action_return(&ret, &path).is_empty());

        // body is required
        let ret = ActionReturn::default();
        let errors = validate_action_return(&ret, &path);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Required);

        // 3XX codes are not allowed in returns
        let ret = ActionReturn {
            code: Some(301),
            type_: String::new(),
            body: "moved".to_string(),
        };
        assert_eq!(validate_action_return(&ret, &path).len(), 1);
    }

    #[test]
    fn test_return_body_special_variables() {
        let path = root().index(0).child("action").child("return").child("body");

        assert!(validate_action_return_body("${arg_version}", &path).is_empty());
        assert!(validate_action_return_body("${http_x_version}", &path).is_empty());
        assert!(validate_action_return_body("${cookie_user}", &path).is_empty());

        // http_ names must use '_' for '-'
        assert!(!validate_action_return_body("${http_x-version}", &path).is_empty());
        assert!(!validate_action_return_body("${arg_}", &path).is_empty());
        assert!(!validate_action_return_body("${cookie_bad-name}", &path).is_empty());
        // outside every whitelist
        assert!(!validate_action_return_body("${upstream_addr}", &path).is_empty());
    }

    #[test]
    fn test_splits() {
        let path = root().index(0).child("splits");
        let upstreams = names(&["tea-v1", "tea-v2"]);

        let splits = vec![
            Split { weight: 90, action: Some(pass("tea-v1")) },
            Split { weight: 10, action: Some(pass("tea-v2")) },
        ];
        assert!(validate_splits(&splits, &path, &upstreams).is_empty());

        // fewer than 2 splits
        let splits = vec![Split { weight: 100, action: Some(pass("tea-v1")) }];
        assert_eq!(validate_splits(&splits, &path, &upstreams).len(), 1);

        // weights out of range and not summing to 100
        let splits = vec![
            Split { weight: 0, action: Some(pass("tea-v1")) },
            Split { weight: 101, action: Some(pass("tea-v2")) },
        ];
        let errors = validate_splits(&splits, &path, &upstreams);
        let kinds: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
        assert!(kinds.contains(&"spec.routes[0].splits[0].weight"));
        assert!(kinds.contains(&"spec.routes[0].splits[1].weight"));
        assert!(kinds.contains(&"spec.routes[0].splits"));

        // missing action
        let splits = vec![
            Split { weight: 50, action: None },
            Split { weight: 50, action: Some(pass("tea-v1")) },
        ];
        let errors = validate_splits(&splits, &path, &upstreams);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "spec.routes[0].splits[0].action");
    }

    #[test]
    fn test_match_rules() {
        let path = root().index(0).child("matches").index(0);
        let upstreams = names(&["tea-v2"]);

        let m = Match {
            conditions: vec![Condition {
                header: "x-version".to_string(),
                value: "v2".to_string(),
                ..Default::default()
            }],
            action: Some(pass("tea-v2")),
            splits: vec![],
        };
        assert!(validate_match(&m, &path, &upstreams).is_empty());

        // no conditions
        let m = Match {
            conditions: vec![],
            action: Some(pass("tea-v2")),
            splits: vec![],
        };
        let errors = validate_match(&m, &path, &upstreams);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "spec.routes[0].matches[0].conditions");

        // both action and splits
        let m = Match {
            conditions: vec![Condition {
                header: "x-version".to_string(),
                value: "v2".to_string(),
                ..Default::default()
            }],
            action: Some(pass("tea-v2")),
            splits: vec![
                Split { weight: 50, action: Some(pass("tea-v2")) },
                Split { weight: 50, action: Some(pass("tea-v2")) },
            ],
        };
        let errors = validate_match(&m, &path, &upstreams);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_condition_exactly_one_of() {
        let path = root().index(0).child("matches").index(0).child("conditions").index(0);

        let condition = Condition {
            header: "x-version".to_string(),
            cookie: "user".to_string(),
            value: "v".to_string(),
            ..Default::default()
        };
        let errors = validate_condition(&condition, &path);
        assert_eq!(errors.len(), 1);

        let condition = Condition::default();
        let errors = validate_condition(&condition, &path);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_condition_variable_whitelist() {
        let path = root().index(0).child("matches").index(0).child("conditions").index(0);

        let condition = Condition {
            variable: "$request_method".to_string(),
            value: "POST".to_string(),
            ..Default::default()
        };
        assert!(validate_condition(&condition, &path).is_empty());

        let condition = Condition {
            variable: "$upstream_addr".to_string(),
            value: "x".to_string(),
            ..Default::default()
        };
        assert_eq!(validate_condition(&condition, &path).len(), 1);

        let condition = Condition {
            variable: "request_method".to_string(),
            value: "x".to_string(),
            ..Default::default()
        };
        let errors = validate_condition(&condition, &path);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].detail.contains("must start with `$`"));
    }

    #[test]
    fn test_condition_value_grammar() {
        let path = root().index(0).child("matches").index(0).child("conditions").index(0);

        let condition = Condition {
            header: "x-version".to_string(),
            value: r#"unescaped""#.to_string(),
            ..Default::default()
        };
        let errors = validate_condition(&condition, &path);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].path,
            "spec.routes[0].matches[0].conditions[0].value"
        );
    }

    #[test]
    fn test_subroutes_prefix_rule() {
        let path = FieldPath::new("spec").child("subroutes");
        let upstreams = names(&["coffee"]);

        let routes = vec![Route {
            path: "/coffee/latte".to_string(),
            action: Some(pass("coffee")),
            ..Default::default()
        }];
        assert!(
            validate_virtual_server_route_subroutes(&routes, &path, &upstreams, "/coffee")
                .is_empty()
        );

        // a regex subroute escapes the prefix requirement
        let routes = vec![Route {
            path: "~ ^/latte".to_string(),
            action: Some(pass("coffee")),
            ..Default::default()
        }];
        assert!(
            validate_virtual_server_route_subroutes(&routes, &path, &upstreams, "/coffee")
                .is_empty()
        );

        let routes = vec![Route {
            path: "/tea".to_string(),
            action: Some(pass("coffee")),
            ..Default::default()
        }];
        let errors =
            validate_virtual_server_route_subroutes(&routes, &path, &upstreams, "/coffee");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].detail.contains("must start with '/coffee'"));
    }

    #[test]
    fn test_subroutes_exact_parent_path() {
        let path = FieldPath::new("spec").child("subroutes");
        let upstreams = names(&["coffee"]);

        // exact parent path requires exactly one subroute with the same path
        let routes = vec![Route {
            path: "=/coffee".to_string(),
            action: Some(pass("coffee")),
            ..Default::default()
        }];
        assert!(
            validate_virtual_server_route_subroutes(&routes, &path, &upstreams, "=/coffee")
                .is_empty()
        );

        let routes = vec![Route {
            path: "/coffee".to_string(),
            action: Some(pass("coffee")),
            ..Default::default()
        }];
        let errors =
            validate_virtual_server_route_subroutes(&routes, &path, &upstreams, "=/coffee");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "spec.subroutes[0].path");

        let empty: Vec<Route> = vec![];
        let errors =
            validate_virtual_server_route_subroutes(&empty, &path, &upstreams, "~ ^/coffee");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_subroutes_forbid_route_field() {
        let path = FieldPath::new("spec").child("subroutes");

        let routes = vec![Route {
            path: "/coffee/latte".to_string(),
            route: "default/latte".to_string(),
            ..Default::default()
        }];
        let errors =
            validate_virtual_server_route_subroutes(&routes, &path, &names(&[]), "/coffee");
        let forbidden: Vec<_> = errors
            .iter()
            .filter(|e| e.kind == ErrorKind::Forbidden)
            .collect();
        assert_eq!(forbidden.len(), 1);
        assert_eq!(forbidden[0].path, "spec.subroutes[0].route");
    }
}
