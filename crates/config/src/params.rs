//! Fleet-wide configuration defaults
//!
//! [`ConfigParams`] carries the operator-controlled defaults that apply
//! when a resource does not set a knob itself. The compiler resolves
//! every upstream and location field as "resource value if set, else
//! fleet default".

use serde::{Deserialize, Serialize};

/// Fleet-wide defaults and server-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigParams {
    /// `server_tokens` value for generated servers
    pub server_tokens: String,

    /// Default load-balancing method
    pub lb_method: String,

    /// Default idle keepalive connections per upstream; 0 disables
    pub keepalive: i32,

    pub max_fails: i32,
    pub max_conns: i32,
    pub fail_timeout: String,

    /// Shared-memory zone size per upstream
    pub upstream_zone_size: String,

    pub proxy_connect_timeout: String,
    pub proxy_read_timeout: String,
    pub proxy_send_timeout: String,

    pub client_max_body_size: String,
    pub proxy_max_temp_file_size: String,

    pub proxy_buffering: bool,
    /// `<number> <size>` buffer specification; empty means proxy default
    pub proxy_buffers: String,
    pub proxy_buffer_size: String,

    /// Accept PROXY protocol on listeners
    pub proxy_protocol: bool,

    /// Enable HTTP/2 on TLS-terminated servers
    pub http2: bool,

    /// Emit a Strict-Transport-Security header on TLS-terminated servers
    pub hsts: bool,
    pub hsts_max_age: i64,
    pub hsts_include_subdomains: bool,

    pub real_ip_header: String,
    pub set_real_ip_from: Vec<String>,
    pub real_ip_recursive: bool,

    /// Verbatim snippets appended to every generated server block
    pub server_snippets: Vec<String>,

    /// Verbatim snippets appended to every generated location block
    pub location_snippets: Vec<String>,
}

impl Default for ConfigParams {
    fn default() -> Self {
        Self {
            server_tokens: "on".to_string(),
            lb_method: "random two least_conn".to_string(),
            keepalive: 0,
            max_fails: 1,
            max_conns: 0,
            fail_timeout: "10s".to_string(),
            upstream_zone_size: "256k".to_string(),
            proxy_connect_timeout: "60s".to_string(),
            proxy_read_timeout: "60s".to_string(),
            proxy_send_timeout: "60s".to_string(),
            client_max_body_size: "1m".to_string(),
            proxy_max_temp_file_size: "1024m".to_string(),
            proxy_buffering: true,
            proxy_buffers: String::new(),
            proxy_buffer_size: String::new(),
            proxy_protocol: false,
            http2: false,
            hsts: false,
            hsts_max_age: 2_592_000,
            hsts_include_subdomains: false,
            real_ip_header: String::new(),
            set_real_ip_from: Vec::new(),
            real_ip_recursive: false,
            server_snippets: Vec::new(),
            location_snippets: Vec::new(),
        }
    }
}

impl ConfigParams {
    /// An empty parameter set, useful where a test wants every generated
    /// field to reflect only the resource under test.
    pub fn empty() -> Self {
        Self {
            server_tokens: String::new(),
            lb_method: String::new(),
            keepalive: 0,
            max_fails: 0,
            max_conns: 0,
            fail_timeout: String::new(),
            upstream_zone_size: String::new(),
            proxy_connect_timeout: String::new(),
            proxy_read_timeout: String::new(),
            proxy_send_timeout: String::new(),
            client_max_body_size: String::new(),
            proxy_max_temp_file_size: String::new(),
            proxy_buffering: false,
            proxy_buffers: String::new(),
            proxy_buffer_size: String::new(),
            proxy_protocol: false,
            http2: false,
            hsts: false,
            hsts_max_age: 0,
            hsts_include_subdomains: false,
            real_ip_header: String::new(),
            set_real_ip_from: Vec::new(),
            real_ip_recursive: false,
            server_snippets: Vec::new(),
            location_snippets: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = ConfigParams::default();
        assert_eq!(params.server_tokens, "on");
        assert_eq!(params.lb_method, "random two least_conn");
        assert_eq!(params.max_fails, 1);
        assert_eq!(params.fail_timeout, "10s");
        assert_eq!(params.upstream_zone_size, "256k");
        assert!(params.proxy_buffering);
    }
}
