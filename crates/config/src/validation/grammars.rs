//! String grammars used by the validator
//!
//! Every textual field of a routing resource is checked against one of the
//! grammars below before it is allowed anywhere near a rendered config.
//! The helpers return a list of human-readable messages, empty when the
//! value is well-formed, so callers can attach each message to a field
//! path.

use once_cell::sync::Lazy;
use regex::Regex;

// ============================================================================
// Name Grammars
// ============================================================================

const DNS1123_SUBDOMAIN_FMT: &str = r"[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*";
const DNS1123_SUBDOMAIN_MAX_LEN: usize = 253;

static DNS1123_SUBDOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{}$", DNS1123_SUBDOMAIN_FMT)).unwrap());

/// Validate a DNS-1123 subdomain (hosts, secret names).
pub fn is_dns1123_subdomain(value: &str) -> Vec<String> {
    let mut msgs = Vec::new();
    if value.len() > DNS1123_SUBDOMAIN_MAX_LEN {
        msgs.push(format!(
            "must be no more than {} characters",
            DNS1123_SUBDOMAIN_MAX_LEN
        ));
    }
    if !DNS1123_SUBDOMAIN_RE.is_match(value) {
        msgs.push(
            "must consist of lower case alphanumeric characters, '-' or '.', and must start \
             and end with an alphanumeric character (e.g. 'example.com')"
                .to_string(),
        );
    }
    msgs
}

const DNS1035_LABEL_FMT: &str = r"[a-z]([-a-z0-9]*[a-z0-9])?";
const DNS1035_LABEL_MAX_LEN: usize = 63;

static DNS1035_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{}$", DNS1035_LABEL_FMT)).unwrap());

/// Validate a DNS-1035 label (service and upstream names).
pub fn is_dns1035_label(value: &str) -> Vec<String> {
    let mut msgs = Vec::new();
    if value.len() > DNS1035_LABEL_MAX_LEN {
        msgs.push(format!("must be no more than {} characters", DNS1035_LABEL_MAX_LEN));
    }
    if !DNS1035_LABEL_RE.is_match(value) {
        msgs.push(
            "must consist of lower case alphanumeric characters or '-', start with an \
             alphabetic character, and end with an alphanumeric character (e.g. 'my-name')"
                .to_string(),
        );
    }
    msgs
}

const QUALIFIED_NAME_FMT: &str = r"[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?";
const QUALIFIED_NAME_MAX_LEN: usize = 63;

static QUALIFIED_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{}$", QUALIFIED_NAME_FMT)).unwrap());

/// Validate a qualified name: an optional DNS subdomain prefix followed by
/// `/` and a name segment. Used for delegation references and label keys.
pub fn is_qualified_name(value: &str) -> Vec<String> {
    let mut msgs = Vec::new();

    let parts: Vec<&str> = value.split('/').collect();
    let name = match parts.len() {
        1 => parts[0],
        2 => {
            let (prefix, name) = (parts[0], parts[1]);
            if prefix.is_empty() {
                msgs.push("prefix part must be non-empty".to_string());
            } else {
                for msg in is_dns1123_subdomain(prefix) {
                    msgs.push(format!("prefix part {}", msg));
                }
            }
            name
        }
        _ => {
            msgs.push(
                "a qualified name must consist of alphanumeric characters, '-', '_' or '.', \
                 with an optional DNS subdomain prefix and '/' (e.g. 'example.com/MyName')"
                    .to_string(),
            );
            return msgs;
        }
    };

    if name.is_empty() {
        msgs.push("name part must be non-empty".to_string());
    } else if name.len() > QUALIFIED_NAME_MAX_LEN {
        msgs.push(format!(
            "name part must be no more than {} characters",
            QUALIFIED_NAME_MAX_LEN
        ));
    }
    if !name.is_empty() && !QUALIFIED_NAME_RE.is_match(name) {
        msgs.push(
            "name part must consist of alphanumeric characters, '-', '_' or '.', and must \
             start and end with an alphanumeric character (e.g. 'MyName')"
                .to_string(),
        );
    }

    msgs
}

const LABEL_VALUE_MAX_LEN: usize = 63;

/// Validate a label value (subselector values). The empty string is valid.
pub fn is_valid_label_value(value: &str) -> Vec<String> {
    let mut msgs = Vec::new();
    if value.len() > LABEL_VALUE_MAX_LEN {
        msgs.push(format!("must be no more than {} characters", LABEL_VALUE_MAX_LEN));
    }
    if !value.is_empty() && !QUALIFIED_NAME_RE.is_match(value) {
        msgs.push(
            "a valid label value must be an empty string or consist of alphanumeric \
             characters, '-', '_' or '.', and must start and end with an alphanumeric \
             character"
                .to_string(),
        );
    }
    msgs
}

static HTTP_HEADER_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-A-Za-z0-9]+$").unwrap());

/// Validate an HTTP header name.
pub fn is_http_header_name(value: &str) -> Vec<String> {
    if !HTTP_HEADER_NAME_RE.is_match(value) {
        return vec![
            "a valid HTTP header must consist of alphanumeric characters or '-'".to_string(),
        ];
    }
    vec![]
}

const COOKIE_NAME_FMT: &str = "[_A-Za-z0-9]+";

static COOKIE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{}$", COOKIE_NAME_FMT)).unwrap());

/// Validate a cookie name.
pub fn is_cookie_name(value: &str) -> Vec<String> {
    if !COOKIE_NAME_RE.is_match(value) {
        return vec![
            "a valid cookie name must consist of alphanumeric characters or '_'".to_string(),
        ];
    }
    vec![]
}

/// Validate a query argument name.
pub fn is_argument_name(value: &str) -> Vec<String> {
    if !COOKIE_NAME_RE.is_match(value) {
        return vec![
            "a valid argument name must consist of alphanumeric characters or '_'".to_string(),
        ];
    }
    vec![]
}

// ============================================================================
// Value Grammars
// ============================================================================

pub(crate) const ESCAPED_STRING_ERR_MSG: &str = r#"must have all '"' (double quotes) escaped and must not end with an unescaped '\' (backslash)"#;

static ESCAPED_STRING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^([^"\\]|\\.)*$"#).unwrap());

/// Validate a string destined for a double-quoted position in the rendered
/// config: every `"` escaped, no trailing lone `\`.
pub fn is_escaped_string(value: &str) -> bool {
    ESCAPED_STRING_RE.is_match(value)
}

/// Validate a condition match value.
pub fn is_valid_match_value(value: &str) -> Vec<String> {
    if !is_escaped_string(value) {
        return vec![ESCAPED_STRING_ERR_MSG.to_string()];
    }
    vec![]
}

static HEADER_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^([^"$\\]|\\[^$])*$"#).unwrap());

/// Validate a header value: escaped quotes, no `$`, no trailing lone `\`.
pub fn is_valid_header_value(value: &str) -> Vec<String> {
    if !HEADER_VALUE_RE.is_match(value) {
        return vec![
            r#"a valid header value must have all '"' escaped and must not contain any '$' or end with an unescaped '\'"#
                .to_string(),
        ];
    }
    vec![]
}

static RETURN_TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^([^;{}"\\]|\\.)*$"#).unwrap());

/// Validate a MIME type for a canned response.
pub fn is_valid_return_type(value: &str) -> Vec<String> {
    if !RETURN_TYPE_RE.is_match(value) {
        return vec![
            r#"must have all '"' (double quotes), '{', '}' or ';' escaped and must not end with an unescaped '\' (backslash)"#
                .to_string(),
        ];
    }
    vec![]
}

static PATH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/[^\s{};]*$").unwrap());

/// Validate a prefix location path.
pub fn is_valid_path(value: &str) -> Vec<String> {
    if !PATH_RE.is_match(value) {
        return vec![
            "must start with / and must not include any whitespace character, `{`, `}` or `;`"
                .to_string(),
        ];
    }
    vec![]
}

// ============================================================================
// Sizes, Offsets and Ports
// ============================================================================

static OFFSET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[kKmMgG]?$").unwrap());

/// Validate an NGINX offset value (`16`, `32k`, `64M`, `1G`). The empty
/// string is valid and means "use default".
pub fn is_valid_offset(value: &str) -> Vec<String> {
    if value.is_empty() {
        return vec![];
    }
    if !OFFSET_RE.is_match(value) {
        return vec![
            "must consist of numeric characters followed by a valid size suffix 'k|K|m|M|g|G'"
                .to_string(),
        ];
    }
    vec![]
}

static SIZE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[kKmM]?$").unwrap());

/// Validate an NGINX size value (`16`, `32k`, `64M`). Unlike offsets,
/// sizes have no `G` suffix. The empty string is valid.
pub fn is_valid_size(value: &str) -> Vec<String> {
    if value.is_empty() {
        return vec![];
    }
    if !SIZE_RE.is_match(value) {
        return vec![
            "must consist of numeric characters followed by a valid size suffix 'k|K|m|M'"
                .to_string(),
        ];
    }
    vec![]
}

/// Validate a port number.
pub fn is_valid_port(port: i32) -> Vec<String> {
    if !(1..=65535).contains(&port) {
        return vec!["must be between 1 and 65535, inclusive".to_string()];
    }
    vec![]
}

// ============================================================================
// Durations
// ============================================================================

// Unit suffixes accepted by NGINX time values, largest first.
const DURATION_UNITS: [&str; 8] = ["y", "M", "w", "d", "h", "m", "s", "ms"];

/// Parse an NGINX duration such as `30s`, `1h30m` or `200ms`.
///
/// A duration is a sequence of `<number><unit>` components with units in
/// strictly decreasing order; a bare trailing number means seconds. The
/// empty string is rejected here; callers that treat it as "use default"
/// must check before calling.
pub fn parse_duration(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("must not be empty".to_string());
    }
    if value.contains(char::is_whitespace) {
        return Err("must not contain whitespace".to_string());
    }

    let mut rest = value;
    // Index into DURATION_UNITS of the last unit seen; components must use
    // strictly smaller units from left to right.
    let mut min_next_unit = 0usize;

    while !rest.is_empty() {
        let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits_end == 0 {
            return Err(format!("invalid duration: unexpected '{}'", rest));
        }
        let number = &rest[..digits_end];
        if number.parse::<u64>().is_err() {
            return Err(format!("invalid number '{}'", number));
        }
        rest = &rest[digits_end..];

        if rest.is_empty() {
            // Bare trailing number means seconds; only valid if seconds
            // have not been used yet.
            let seconds_idx = DURATION_UNITS.iter().position(|u| *u == "s").unwrap();
            if min_next_unit > seconds_idx {
                return Err("seconds specified twice".to_string());
            }
            return Ok(());
        }

        // "ms" must be matched before "m".
        let (unit, unit_idx) = if let Some(stripped) = rest.strip_prefix("ms") {
            rest = stripped;
            ("ms", DURATION_UNITS.len() - 1)
        } else {
            let mut found = None;
            for (idx, u) in DURATION_UNITS.iter().enumerate() {
                if *u != "ms" {
                    if let Some(stripped) = rest.strip_prefix(u) {
                        rest = stripped;
                        found = Some((*u, idx));
                        break;
                    }
                }
            }
            match found {
                Some(f) => f,
                None => return Err(format!("invalid duration unit in '{}'", rest)),
            }
        };

        if unit_idx < min_next_unit {
            return Err(format!("duration unit '{}' out of order", unit));
        }
        min_next_unit = unit_idx + 1;
    }

    Ok(())
}

/// Validate a duration field; the empty string means "use default".
pub fn is_valid_time(value: &str) -> Vec<String> {
    if value.is_empty() {
        return vec![];
    }
    match parse_duration(value) {
        Ok(()) => vec![],
        Err(msg) => vec![msg],
    }
}

// ============================================================================
// Status Match Expressions
// ============================================================================

/// Validate a health-check status match expression: space-separated codes
/// (100-999) and `lo-hi` ranges, with one optional leading `! ` negation.
pub fn validate_status_match(value: &str) -> Vec<String> {
    let mut msgs = Vec::new();

    if value.starts_with('!') && !value.starts_with("! ") {
        msgs.push("must have a space character after the `!`".to_string());
    }

    for (i, token) in value.split(' ').enumerate() {
        if token == "!" {
            if i != 0 {
                msgs.push("`!` can only appear once at the beginning".to_string());
            }
        } else if token.contains('-') {
            if let Some(msg) = validate_status_code_range(token) {
                msgs.push(msg);
            }
        } else if let Some(msg) = validate_status_code(token) {
            msgs.push(msg);
        }
    }

    msgs
}

fn validate_status_code_range(range: &str) -> Option<String> {
    let bounds: Vec<&str> = range.split('-').collect();
    if bounds.len() != 2 {
        return Some("ranges must only have 2 numbers".to_string());
    }

    for bound in &bounds {
        if let Some(msg) = validate_status_code(bound) {
            return Some(msg);
        }
    }

    // Both bounds parsed above.
    let lo: i32 = bounds[0].parse().unwrap();
    let hi: i32 = bounds[1].parse().unwrap();
    if hi <= lo {
        return Some(format!("range limits must be {} < {}", lo, hi));
    }

    None
}

fn validate_status_code(code: &str) -> Option<String> {
    let parsed: i32 = match code.parse() {
        Ok(n) => n,
        Err(_) => return Some(format!("{} must be a valid integer", code)),
    };
    if !(100..=999).contains(&parsed) {
        return Some("must be between 100 and 999, inclusive".to_string());
    }
    None
}

// ============================================================================
// Variable Capture
// ============================================================================

static VARIABLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]*)\}").unwrap());

/// Return the variable names enclosed in `${}`. For example
/// `"${a} ${b}"` yields `["a", "b"]`.
pub fn capture_variables(value: &str) -> Vec<&str> {
    VARIABLE_RE
        .captures_iter(value)
        .map(|c| c.get(1).unwrap().as_str())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
