//! Route lowering
//!
//! Turns a single route into its generated fragments:
//!
//! - a plain action becomes one location;
//! - weighted splits become a `split_clients` block, one named location
//!   per split, and an internal redirect driven by the split variable;
//! - matches become a chain of `map` blocks per match (conjunction
//!   short-circuits on failure: each condition's success result is the
//!   next condition's variable), a main map whose source concatenates the
//!   first-condition variables into a binary string matched by `~^0*1`
//!   patterns (disjunction across matches), named locations, and an
//!   internal redirect driven by the main map variable.
//!
//! The binary-string main map is part of the contract with the template;
//! the patterns and their order must not change.

use std::collections::HashMap;

use crate::compiler::{bool_or_default, string_or_default};
use crate::model::{
    Distribution, InternalRedirectLocation, Location, MapBlock, Parameter, ReturnBlock,
    SplitClient,
};
use crate::names::{
    match_default_location_name, match_location_name, split_location_name, UpstreamNamer,
    VariableNamer,
};
use crate::params::ConfigParams;
use crate::resources::{Action, Condition, Route, Split, Upstream};

use super::upstreams::{
    generate_buffers, generate_proxy_pass_protocol, upstream_has_keepalive,
};

/// Map parameter keywords that must be escaped with a leading backslash
/// when used as literal match values.
const SPECIAL_MAP_PARAMETERS: &[&str] = &["default", "hostnames", "include", "volatile"];

/// Generated fragments of one route.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RoutingConfig {
    pub maps: Vec<MapBlock>,
    pub split_clients: Vec<SplitClient>,
    pub locations: Vec<Location>,
    pub internal_redirect_location: InternalRedirectLocation,
}

// ============================================================================
// Locations
// ============================================================================

/// Wrap the pattern of a regex path in double quotes to avoid config
/// parsing errors; other paths pass through unchanged.
pub(crate) fn generate_path(path: &str) -> String {
    if let Some(pattern) = path.strip_prefix("~*") {
        return format!("~* \"{}\"", pattern.trim_start_matches(' '));
    }
    if let Some(pattern) = path.strip_prefix('~') {
        return format!("~ \"{}\"", pattern.trim_start_matches(' '));
    }
    path.to_string()
}

pub(crate) fn generate_return_block(
    text: &str,
    code: Option<u16>,
    default_code: u16,
) -> ReturnBlock {
    ReturnBlock {
        code: code.unwrap_or(default_code),
        text: text.to_string(),
    }
}

/// Lower an action at a path into a location.
pub(crate) fn generate_location(
    path: &str,
    upstream_name: &str,
    upstream: &Upstream,
    action: &Action,
    params: &ConfigParams,
) -> Location {
    if let Some(redirect) = &action.redirect {
        let return_block = generate_return_block(&redirect.url, redirect.code, 301);
        return generate_location_for_return_block(
            path,
            &params.location_snippets,
            return_block,
            "",
        );
    }

    if let Some(ret) = &action.return_ {
        let default_type = if ret.type_.is_empty() {
            "text/plain"
        } else {
            &ret.type_
        };
        let return_block = generate_return_block(&ret.body, ret.code, 200);
        return generate_location_for_return_block(
            path,
            &params.location_snippets,
            return_block,
            default_type,
        );
    }

    generate_location_for_proxying(path, upstream_name, upstream, params)
}

pub(crate) fn generate_location_for_proxying(
    path: &str,
    upstream_name: &str,
    upstream: &Upstream,
    params: &ConfigParams,
) -> Location {
    Location {
        path: generate_path(path),
        snippets: params.location_snippets.clone(),
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
        client_max_body_size: string_or_default(
            &upstream.client_max_body_size,
            &params.client_max_body_size,
        ),
        proxy_max_temp_file_size: params.proxy_max_temp_file_size.clone(),
        proxy_buffering: bool_or_default(upstream.proxy_buffering, params.proxy_buffering),
        proxy_buffers: generate_buffers(upstream.proxy_buffers.as_ref(), &params.proxy_buffers),
        proxy_buffer_size: string_or_default(
            &upstream.proxy_buffer_size,
            &params.proxy_buffer_size,
        ),
        proxy_pass: format!(
            "{}://{}",
            generate_proxy_pass_protocol(upstream.tls.enable),
            upstream_name
        ),
        proxy_next_upstream: string_or_default(&upstream.proxy_next_upstream, "error timeout"),
        proxy_next_upstream_timeout: string_or_default(
            &upstream.proxy_next_upstream_timeout,
            "0s",
        ),
        proxy_next_upstream_tries: upstream.proxy_next_upstream_tries,
        has_keepalive: upstream_has_keepalive(upstream, params),
        ..Default::default()
    }
}

fn generate_location_for_return_block(
    path: &str,
    location_snippets: &[String],
    return_block: ReturnBlock,
    default_type: &str,
) -> Location {
    Location {
        path: path.to_string(),
        snippets: location_snippets.to_vec(),
        default_type: default_type.to_string(),
        return_block: Some(return_block),
        ..Default::default()
    }
}

// ============================================================================
// Splits
// ============================================================================

/// Lower a splits list into one `split_clients` block plus the named
/// locations its distributions point at.
pub(crate) fn generate_splits(
    splits: &[Split],
    upstream_namer: &UpstreamNamer,
    cr_upstreams: &HashMap<String, Upstream>,
    variable_namer: &VariableNamer,
    sc_index: usize,
    params: &ConfigParams,
) -> (SplitClient, Vec<Location>) {
    let distributions = splits
        .iter()
        .enumerate()
        .map(|(i, split)| Distribution {
            weight: format!("{}%", split.weight),
            value: split_location_name(sc_index, i),
        })
        .collect();

    let split_client = SplitClient {
        source: "$request_id".to_string(),
        variable: variable_namer.split_client_variable(sc_index),
        distributions,
    };

    let locations = splits
        .iter()
        .enumerate()
        .map(|(i, split)| {
            let path = split_location_name(sc_index, i);
            let action = split.action.as_ref().expect("validated split has an action");
            let upstream_name = upstream_namer.name_for_upstream(&action.pass);
            let upstream = cr_upstreams.get(&upstream_name).cloned().unwrap_or_default();
            generate_location(&path, &upstream_name, &upstream, action, params)
        })
        .collect();

    (split_client, locations)
}

/// Lower a route whose only routing decision is a weighted split.
pub(crate) fn generate_default_splits_config(
    route: &Route,
    upstream_namer: &UpstreamNamer,
    cr_upstreams: &HashMap<String, Upstream>,
    variable_namer: &VariableNamer,
    sc_index: usize,
    params: &ConfigParams,
) -> RoutingConfig {
    let (split_client, locations) = generate_splits(
        &route.splits,
        upstream_namer,
        cr_upstreams,
        variable_namer,
        sc_index,
        params,
    );

    let internal_redirect_location = InternalRedirectLocation {
        path: route.path.clone(),
        destination: variable_namer.split_client_variable(sc_index),
    };

    RoutingConfig {
        split_clients: vec![split_client],
        locations,
        internal_redirect_location,
        ..Default::default()
    }
}

// ============================================================================
// Matches
// ============================================================================

/// Lower a matches route: per-condition map chains, the binary-string
/// main map, the per-match and default locations (or nested split
/// clients), and the internal redirect.
///
/// `index` is the match index of this route; `sc_index` the next free
/// split-client index. Nested splits allocate split-client indices before
/// the default splits.
pub(crate) fn generate_matches_config(
    route: &Route,
    upstream_namer: &UpstreamNamer,
    cr_upstreams: &HashMap<String, Upstream>,
    variable_namer: &VariableNamer,
    index: usize,
    sc_index: usize,
    params: &ConfigParams,
) -> RoutingConfig {
    // Per-condition maps. The j-th map of a match forwards to the
    // variable of condition j+1 on success, so a failed condition
    // short-circuits the whole chain to "0".
    let mut maps = Vec::new();

    for (i, m) in route.matches.iter().enumerate() {
        for (j, condition) in m.conditions.iter().enumerate() {
            let successful_result = if j < m.conditions.len() - 1 {
                variable_namer.matches_map_variable(index, i, j + 1)
            } else {
                "1".to_string()
            };

            maps.push(MapBlock {
                source: condition_source(condition),
                variable: variable_namer.matches_map_variable(index, i, j),
                parameters: generate_parameters_for_matches_route_map(
                    &condition.value,
                    &successful_result,
                ),
            });
        }
    }

    // Main map. The source concatenates the first-condition variable of
    // every match, so its value is an n-character binary string; match k
    // wins when the first k characters are zero and the (k+1)-th is one.
    let mut sc_local_index = 0usize;
    let mut source = String::new();
    let mut parameters = Vec::new();

    for (i, m) in route.matches.iter().enumerate() {
        source.push_str(&variable_namer.matches_map_variable(index, i, 0));

        let result = if !m.splits.is_empty() {
            let r = variable_namer.split_client_variable(sc_index + sc_local_index);
            sc_local_index += 1;
            r
        } else {
            match_location_name(index, i)
        };

        parameters.push(Parameter {
            value: format!("~^{}1", "0".repeat(i)),
            result,
        });
    }

    let default_result = if !route.splits.is_empty() {
        variable_namer.split_client_variable(sc_index + sc_local_index)
    } else {
        match_default_location_name(index)
    };
    parameters.push(Parameter {
        value: "default".to_string(),
        result: default_result,
    });

    let main_map_variable = variable_namer.matches_main_map_variable(index);
    maps.push(MapBlock {
        source,
        variable: main_map_variable.clone(),
        parameters,
    });

    // Locations for each match, then the default.
    let mut locations = Vec::new();
    let mut split_clients = Vec::new();
    sc_local_index = 0;

    for (i, m) in route.matches.iter().enumerate() {
        if !m.splits.is_empty() {
            let (sc, locs) = generate_splits(
                &m.splits,
                upstream_namer,
                cr_upstreams,
                variable_namer,
                sc_index + sc_local_index,
                params,
            );
            sc_local_index += 1;
            split_clients.push(sc);
            locations.extend(locs);
        } else {
            let path = match_location_name(index, i);
            let action = m.action.as_ref().expect("validated match has an action");
            let upstream_name = upstream_namer.name_for_upstream(&action.pass);
            let upstream = cr_upstreams.get(&upstream_name).cloned().unwrap_or_default();
            locations.push(generate_location(&path, &upstream_name, &upstream, action, params));
        }
    }

    if !route.splits.is_empty() {
        let (sc, locs) = generate_splits(
            &route.splits,
            upstream_namer,
            cr_upstreams,
            variable_namer,
            sc_index + sc_local_index,
            params,
        );
        split_clients.push(sc);
        locations.extend(locs);
    } else {
        let path = match_default_location_name(index);
        let action = route.action.as_ref().expect("validated route has an action");
        let upstream_name = upstream_namer.name_for_upstream(&action.pass);
        let upstream = cr_upstreams.get(&upstream_name).cloned().unwrap_or_default();
        locations.push(generate_location(&path, &upstream_name, &upstream, action, params));
    }

    let internal_redirect_location = InternalRedirectLocation {
        path: route.path.clone(),
        destination: main_map_variable,
    };

    RoutingConfig {
        maps,
        locations,
        internal_redirect_location,
        split_clients,
    }
}

/// NGINX variable a condition reads from.
pub(crate) fn condition_source(condition: &Condition) -> String {
    if !condition.header.is_empty() {
        return format!("$http_{}", condition.header.replace('-', "_"));
    }
    if !condition.cookie.is_empty() {
        return format!("$cookie_{}", condition.cookie);
    }
    if !condition.argument.is_empty() {
        return format!("$arg_{}", condition.argument);
    }
    condition.variable.clone()
}

/// Render a match value as a map literal. Returns the rendered value and
/// whether the comparison is negated.
pub(crate) fn generate_value_for_matches_route_map(matched_value: &str) -> (String, bool) {
    if matched_value.is_empty() {
        return ("\"\"".to_string(), false);
    }

    let (value, is_negative) = match matched_value.strip_prefix('!') {
        Some(stripped) => (stripped, true),
        None => (matched_value, false),
    };

    if value.is_empty() {
        return ("\"\"".to_string(), is_negative);
    }

    // Bare map keywords need the map-literal escape.
    if SPECIAL_MAP_PARAMETERS.contains(&value) {
        return (format!("\\{}", value), is_negative);
    }

    (format!("\"{}\"", value), is_negative)
}

/// The two parameters of a per-condition map. Negation swaps the result
/// fields, so a negated condition short-circuits on the matched value.
pub(crate) fn generate_parameters_for_matches_route_map(
    matched_value: &str,
    successful_result: &str,
) -> Vec<Parameter> {
    let (value, is_negative) = generate_value_for_matches_route_map(matched_value);

    let (value_result, default_result) = if is_negative {
        ("0".to_string(), successful_result.to_string())
    } else {
        (successful_result.to_string(), "0".to_string())
    };

    vec![
        Parameter {
            value,
            result: value_result,
        },
        Parameter {
            value: "default".to_string(),
            result: default_result,
        },
    ]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{ActionRedirect, ActionReturn, Match, Metadata, VirtualServer};

    fn test_vs() -> VirtualServer {
        VirtualServer {
            metadata: Metadata {
                name: "cafe".to_string(),
                namespace: "default".to_string(),
            },
            ..Default::default()
        }
    }

    fn pass(upstream: &str) -> Action {
        Action {
            pass: upstream.to_string(),
            ..Default::default()
        }
    }

    fn proxy_location(path: &str, upstream_name: &str) -> Location {
        Location {
            path: path.to_string(),
            proxy_pass: format!("http://{}", upstream_name),
            proxy_next_upstream: "error timeout".to_string(),
            proxy_next_upstream_timeout: "0s".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_path_quotes_regex() {
        assert_eq!(generate_path("/tea"), "/tea");
        assert_eq!(generate_path("=/tea"), "=/tea");
        assert_eq!(generate_path("~ ^/tea/.*"), "~ \"^/tea/.*\"");
        assert_eq!(generate_path("~*^/tea$"), "~* \"^/tea$\"");
        assert_eq!(generate_path("@splits_0_split_0"), "@splits_0_split_0");
    }

    #[test]
    fn test_generate_return_block() {
        assert_eq!(
            generate_return_block("Hello World!", None, 200),
            ReturnBlock {
                code: 200,
                text: "Hello World!".to_string(),
            }
        );
        assert_eq!(
            generate_return_block("Hello World!", Some(400), 200),
            ReturnBlock {
                code: 400,
                text: "Hello World!".to_string(),
            }
        );
    }

    #[test]
    fn test_generate_location_for_proxying() {
        let params = ConfigParams {
            proxy_connect_timeout: "30s".to_string(),
            proxy_read_timeout: "31s".to_string(),
            proxy_send_timeout: "32s".to_string(),
            client_max_body_size: "1m".to_string(),
            proxy_max_temp_file_size: "1024m".to_string(),
            proxy_buffering: true,
            proxy_buffers: "8 4k".to_string(),
            proxy_buffer_size: "4k".to_string(),
            location_snippets: vec!["# location snippet".to_string()],
            ..ConfigParams::empty()
        };

        let expected = Location {
            path: "/".to_string(),
            snippets: vec!["# location snippet".to_string()],
            proxy_connect_timeout: "30s".to_string(),
            proxy_read_timeout: "31s".to_string(),
            proxy_send_timeout: "32s".to_string(),
            client_max_body_size: "1m".to_string(),
            proxy_max_temp_file_size: "1024m".to_string(),
            proxy_buffering: true,
            proxy_buffers: "8 4k".to_string(),
            proxy_buffer_size: "4k".to_string(),
            proxy_pass: "http://test-upstream".to_string(),
            proxy_next_upstream: "error timeout".to_string(),
            proxy_next_upstream_timeout: "0s".to_string(),
            ..Default::default()
        };

        let result =
            generate_location_for_proxying("/", "test-upstream", &Upstream::default(), &params);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_generate_location_for_redirect() {
        let params = ConfigParams {
            location_snippets: vec!["# location snippet".to_string()],
            ..ConfigParams::empty()
        };
        let action = Action {
            redirect: Some(ActionRedirect {
                url: "http://www.nginx.com".to_string(),
                code: None,
            }),
            ..Default::default()
        };

        let result = generate_location("/", "", &Upstream::default(), &action, &params);
        assert_eq!(
            result,
            Location {
                path: "/".to_string(),
                snippets: vec!["# location snippet".to_string()],
                return_block: Some(ReturnBlock {
                    code: 301,
                    text: "http://www.nginx.com".to_string(),
                }),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_generate_location_for_return() {
        let action = Action {
            return_: Some(ActionReturn {
                code: None,
                type_: String::new(),
                body: "Hello World!".to_string(),
            }),
            ..Default::default()
        };

        let result =
            generate_location("/", "", &Upstream::default(), &action, &ConfigParams::empty());
        assert_eq!(result.default_type, "text/plain");
        assert_eq!(
            result.return_block,
            Some(ReturnBlock {
                code: 200,
                text: "Hello World!".to_string(),
            })
        );

        let action = Action {
            return_: Some(ActionReturn {
                code: Some(503),
                type_: "application/json".to_string(),
                body: "{}".to_string(),
            }),
            ..Default::default()
        };
        let result =
            generate_location("/", "", &Upstream::default(), &action, &ConfigParams::empty());
        assert_eq!(result.default_type, "application/json");
        assert_eq!(result.return_block.unwrap().code, 503);
    }

    #[test]
    fn test_generate_splits() {
        let splits = vec![
            Split {
                weight: 90,
                action: Some(pass("coffee-v1")),
            },
            Split {
                weight: 10,
                action: Some(pass("coffee-v2")),
            },
        ];

        let vs = test_vs();
        let upstream_namer = UpstreamNamer::for_virtual_server(&vs);
        let variable_namer = VariableNamer::new(&vs);
        let cr_upstreams = HashMap::new();

        let (split_client, locations) = generate_splits(
            &splits,
            &upstream_namer,
            &cr_upstreams,
            &variable_namer,
            1,
            &ConfigParams::empty(),
        );

        assert_eq!(
            split_client,
            SplitClient {
                source: "$request_id".to_string(),
                variable: "$vs_default_cafe_splits_1".to_string(),
                distributions: vec![
                    Distribution {
                        weight: "90%".to_string(),
                        value: "@splits_1_split_0".to_string(),
                    },
                    Distribution {
                        weight: "10%".to_string(),
                        value: "@splits_1_split_1".to_string(),
                    },
                ],
            }
        );

        assert_eq!(
            locations,
            vec![
                proxy_location("@splits_1_split_0", "vs_default_cafe_coffee-v1"),
                proxy_location("@splits_1_split_1", "vs_default_cafe_coffee-v2"),
            ]
        );
    }

    #[test]
    fn test_generate_default_splits_config() {
        let route = Route {
            path: "/".to_string(),
            splits: vec![
                Split {
                    weight: 90,
                    action: Some(pass("coffee-v1")),
                },
                Split {
                    weight: 10,
                    action: Some(pass("coffee-v2")),
                },
            ],
            ..Default::default()
        };

        let vs = test_vs();
        let result = generate_default_splits_config(
            &route,
            &UpstreamNamer::for_virtual_server(&vs),
            &HashMap::new(),
            &VariableNamer::new(&vs),
            1,
            &ConfigParams::empty(),
        );

        assert_eq!(result.split_clients.len(), 1);
        assert_eq!(result.split_clients[0].variable, "$vs_default_cafe_splits_1");
        assert_eq!(result.locations.len(), 2);
        assert!(result.maps.is_empty());
        assert_eq!(
            result.internal_redirect_location,
            InternalRedirectLocation {
                path: "/".to_string(),
                destination: "$vs_default_cafe_splits_1".to_string(),
            }
        );
    }

    #[test]
    fn test_generate_matches_config() {
        let route = Route {
            path: "/".to_string(),
            matches: vec![
                Match {
                    conditions: vec![
                        Condition {
                            header: "x-version".to_string(),
                            value: "v1".to_string(),
                            ..Default::default()
                        },
                        Condition {
                            cookie: "user".to_string(),
                            value: "john".to_string(),
                            ..Default::default()
                        },
                        Condition {
                            argument: "answer".to_string(),
                            value: "yes".to_string(),
                            ..Default::default()
                        },
                        Condition {
                            variable: "$request_method".to_string(),
                            value: "GET".to_string(),
                            ..Default::default()
                        },
                    ],
                    action: Some(pass("coffee-v1")),
                    splits: vec![],
                },
                Match {
                    conditions: vec![
                        Condition {
                            header: "x-version".to_string(),
                            value: "v2".to_string(),
                            ..Default::default()
                        },
                        Condition {
                            cookie: "user".to_string(),
                            value: "paul".to_string(),
                            ..Default::default()
                        },
                        Condition {
                            argument: "answer".to_string(),
                            value: "no".to_string(),
                            ..Default::default()
                        },
                        Condition {
                            variable: "$request_method".to_string(),
                            value: "POST".to_string(),
                            ..Default::default()
                        },
                    ],
                    action: None,
                    splits: vec![
                        Split {
                            weight: 90,
                            action: Some(pass("coffee-v1")),
                        },
                        Split {
                            weight: 10,
                            action: Some(pass("coffee-v2")),
                        },
                    ],
                },
            ],
            action: Some(pass("tea")),
            ..Default::default()
        };

        let vs = test_vs();
        let result = generate_matches_config(
            &route,
            &UpstreamNamer::for_virtual_server(&vs),
            &HashMap::new(),
            &VariableNamer::new(&vs),
            1,
            2,
            &ConfigParams::empty(),
        );

        // 4 condition maps per match, 2 matches, plus the main map
        assert_eq!(result.maps.len(), 9);

        // first condition map of the first match chains to the second
        assert_eq!(
            result.maps[0],
            MapBlock {
                source: "$http_x_version".to_string(),
                variable: "$vs_default_cafe_matches_1_match_0_cond_0".to_string(),
                parameters: vec![
                    Parameter {
                        value: "\"v1\"".to_string(),
                        result: "$vs_default_cafe_matches_1_match_0_cond_1".to_string(),
                    },
                    Parameter {
                        value: "default".to_string(),
                        result: "0".to_string(),
                    },
                ],
            }
        );

        // last condition map of the first match results in "1"
        assert_eq!(
            result.maps[3],
            MapBlock {
                source: "$request_method".to_string(),
                variable: "$vs_default_cafe_matches_1_match_0_cond_3".to_string(),
                parameters: vec![
                    Parameter {
                        value: "\"GET\"".to_string(),
                        result: "1".to_string(),
                    },
                    Parameter {
                        value: "default".to_string(),
                        result: "0".to_string(),
                    },
                ],
            }
        );

        // sources of the second match
        assert_eq!(result.maps[4].source, "$http_x_version");
        assert_eq!(result.maps[5].source, "$cookie_user");
        assert_eq!(result.maps[6].source, "$arg_answer");
        assert_eq!(result.maps[7].source, "$request_method");

        // main map: match 0 goes to its named location, match 1 (splits)
        // to split-client 2, default to the default location
        assert_eq!(
            result.maps[8],
            MapBlock {
                source: "$vs_default_cafe_matches_1_match_0_cond_0\
                         $vs_default_cafe_matches_1_match_1_cond_0"
                    .to_string(),
                variable: "$vs_default_cafe_matches_1".to_string(),
                parameters: vec![
                    Parameter {
                        value: "~^1".to_string(),
                        result: "@matches_1_match_0".to_string(),
                    },
                    Parameter {
                        value: "~^01".to_string(),
                        result: "$vs_default_cafe_splits_2".to_string(),
                    },
                    Parameter {
                        value: "default".to_string(),
                        result: "@matches_1_default".to_string(),
                    },
                ],
            }
        );

        assert_eq!(
            result.locations,
            vec![
                proxy_location("@matches_1_match_0", "vs_default_cafe_coffee-v1"),
                proxy_location("@splits_2_split_0", "vs_default_cafe_coffee-v1"),
                proxy_location("@splits_2_split_1", "vs_default_cafe_coffee-v2"),
                proxy_location("@matches_1_default", "vs_default_cafe_tea"),
            ]
        );

        assert_eq!(result.split_clients.len(), 1);
        assert_eq!(result.split_clients[0].variable, "$vs_default_cafe_splits_2");

        assert_eq!(
            result.internal_redirect_location,
            InternalRedirectLocation {
                path: "/".to_string(),
                destination: "$vs_default_cafe_matches_1".to_string(),
            }
        );
    }

    #[test]
    fn test_generate_matches_config_with_multiple_splits() {
        let route = Route {
            path: "/".to_string(),
            matches: vec![
                Match {
                    conditions: vec![Condition {
                        header: "x-version".to_string(),
                        value: "v1".to_string(),
                        ..Default::default()
                    }],
                    action: None,
                    splits: vec![
                        Split {
                            weight: 30,
                            action: Some(pass("coffee-v1")),
                        },
                        Split {
                            weight: 70,
                            action: Some(pass("coffee-v2")),
                        },
                    ],
                },
                Match {
                    conditions: vec![Condition {
                        header: "x-version".to_string(),
                        value: "v2".to_string(),
                        ..Default::default()
                    }],
                    action: None,
                    splits: vec![
                        Split {
                            weight: 90,
                            action: Some(pass("coffee-v2")),
                        },
                        Split {
                            weight: 10,
                            action: Some(pass("coffee-v1")),
                        },
                    ],
                },
            ],
            splits: vec![
                Split {
                    weight: 99,
                    action: Some(pass("coffee-v1")),
                },
                Split {
                    weight: 1,
                    action: Some(pass("coffee-v2")),
                },
            ],
            ..Default::default()
        };

        let vs = test_vs();
        let result = generate_matches_config(
            &route,
            &UpstreamNamer::for_virtual_server(&vs),
            &HashMap::new(),
            &VariableNamer::new(&vs),
            1,
            2,
            &ConfigParams::empty(),
        );

        // nested splits allocate indices 2 and 3, the default splits 4
        let main_map = result.maps.last().unwrap();
        assert_eq!(
            main_map.parameters,
            vec![
                Parameter {
                    value: "~^1".to_string(),
                    result: "$vs_default_cafe_splits_2".to_string(),
                },
                Parameter {
                    value: "~^01".to_string(),
                    result: "$vs_default_cafe_splits_3".to_string(),
                },
                Parameter {
                    value: "default".to_string(),
                    result: "$vs_default_cafe_splits_4".to_string(),
                },
            ]
        );

        let variables: Vec<&str> = result
            .split_clients
            .iter()
            .map(|sc| sc.variable.as_str())
            .collect();
        assert_eq!(
            variables,
            vec![
                "$vs_default_cafe_splits_2",
                "$vs_default_cafe_splits_3",
                "$vs_default_cafe_splits_4",
            ]
        );

        assert_eq!(
            result.split_clients[0].distributions,
            vec![
                Distribution {
                    weight: "30%".to_string(),
                    value: "@splits_2_split_0".to_string(),
                },
                Distribution {
                    weight: "70%".to_string(),
                    value: "@splits_2_split_1".to_string(),
                },
            ]
        );

        assert_eq!(
            result.locations,
            vec![
                proxy_location("@splits_2_split_0", "vs_default_cafe_coffee-v1"),
                proxy_location("@splits_2_split_1", "vs_default_cafe_coffee-v2"),
                proxy_location("@splits_3_split_0", "vs_default_cafe_coffee-v2"),
                proxy_location("@splits_3_split_1", "vs_default_cafe_coffee-v1"),
                proxy_location("@splits_4_split_0", "vs_default_cafe_coffee-v1"),
                proxy_location("@splits_4_split_1", "vs_default_cafe_coffee-v2"),
            ]
        );
    }

    #[test]
    fn test_generate_value_for_matches_route_map() {
        let cases = [
            ("default", "\\default", false),
            ("!default", "\\default", true),
            ("hostnames", "\\hostnames", false),
            ("include", "\\include", false),
            ("volatile", "\\volatile", false),
            ("abc", "\"abc\"", false),
            ("!abc", "\"abc\"", true),
            ("", "\"\"", false),
            ("!", "\"\"", true),
        ];

        for (input, expected_value, expected_negative) in cases {
            let (value, is_negative) = generate_value_for_matches_route_map(input);
            assert_eq!(value, expected_value, "input {:?}", input);
            assert_eq!(is_negative, expected_negative, "input {:?}", input);
        }
    }

    #[test]
    fn test_generate_parameters_for_matches_route_map() {
        assert_eq!(
            generate_parameters_for_matches_route_map("abc", "1"),
            vec![
                Parameter {
                    value: "\"abc\"".to_string(),
                    result: "1".to_string(),
                },
                Parameter {
                    value: "default".to_string(),
                    result: "0".to_string(),
                },
            ]
        );

        // negation swaps the results
        assert_eq!(
            generate_parameters_for_matches_route_map("!abc", "1"),
            vec![
                Parameter {
                    value: "\"abc\"".to_string(),
                    result: "0".to_string(),
                },
                Parameter {
                    value: "default".to_string(),
                    result: "1".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_condition_source() {
        let condition = Condition {
            header: "x-version".to_string(),
            ..Default::default()
        };
        assert_eq!(condition_source(&condition), "$http_x_version");

        let condition = Condition {
            cookie: "mycookie".to_string(),
            ..Default::default()
        };
        assert_eq!(condition_source(&condition), "$cookie_mycookie");

        let condition = Condition {
            argument: "arg".to_string(),
            ..Default::default()
        };
        assert_eq!(condition_source(&condition), "$arg_arg");

        let condition = Condition {
            variable: "$request_method".to_string(),
            ..Default::default()
        };
        assert_eq!(condition_source(&condition), "$request_method");
    }
}
