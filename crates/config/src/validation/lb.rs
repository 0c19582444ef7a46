//! Load-balancing method parsing
//!
//! Methods are passed through to the rendered upstream block, so only the
//! exact spellings the proxy understands are accepted. The commercial tier
//! additionally supports the `least_time` family.

use trellis_common::Tier;

const LB_METHODS: &[&str] = &[
    "round_robin",
    "least_conn",
    "ip_hash",
    "random",
    "random two",
    "random two least_conn",
];

const LB_METHODS_COMMERCIAL: &[&str] = &[
    "least_time header",
    "least_time last_byte",
    "least_time header inflight",
    "least_time last_byte inflight",
    "random two least_time=header",
    "random two least_time=last_byte",
];

/// Parse a load-balancing method, returning the normalized method string.
pub fn parse_lb_method(method: &str, tier: Tier) -> Result<String, String> {
    let method = method.trim();

    if method.starts_with("hash") {
        return parse_hash_lb_method(method);
    }

    if LB_METHODS.contains(&method) {
        return Ok(method.to_string());
    }

    if tier.is_commercial() && LB_METHODS_COMMERCIAL.contains(&method) {
        return Ok(method.to_string());
    }

    Err(format!("invalid load balancing method: {:?}", method))
}

// `hash <key>` or `hash <key> consistent`
fn parse_hash_lb_method(method: &str) -> Result<String, String> {
    let words: Vec<&str> = method.split(' ').collect();
    if words[0] == "hash" && (words.len() == 2 || (words.len() == 3 && words[2] == "consistent"))
    {
        return Ok(method.to_string());
    }
    Err(format!("invalid load balancing method: {:?}", method))
}
