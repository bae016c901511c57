//! API Configuration Module
//!
//! HTTP bind settings, the route prefix and the upstream client settings.
//! Loaded from environment variables with defaults for local development.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

/// Default route prefix for record endpoints.
pub const DEFAULT_ROUTE_PREFIX: &str = "/transformers/people";

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    // ========================================================================
    // HTTP
    // ========================================================================
    pub bind_host: String,
    pub port: u16,
    /// Prefix for record routes; no trailing slash.
    pub route_prefix: String,

    // ========================================================================
    // Upstream
    // ========================================================================
    /// Endpoint serving pages of raw terms.
    pub upstream_url: String,
    pub upstream_username: Option<String>,
    pub upstream_password: Option<String>,
    /// Bearer token; takes precedence over basic auth.
    pub upstream_token: Option<String>,
    pub upstream_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            upstream_url: "http://localhost:9000/terms".to_string(),
            upstream_username: None,
            upstream_password: None,
            upstream_token: None,
            upstream_timeout: Duration::from_secs(60),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `TERMCACHE_API_BIND`: Bind host (default: 0.0.0.0)
    /// - `PORT` or `TERMCACHE_API_PORT`: Bind port (default: 8080)
    /// - `TERMCACHE_ROUTE_PREFIX`: Record route prefix (default: /transformers/people)
    /// - `TERMCACHE_UPSTREAM_URL`: Upstream term endpoint
    /// - `TERMCACHE_UPSTREAM_USERNAME` / `TERMCACHE_UPSTREAM_PASSWORD`: Basic auth
    /// - `TERMCACHE_UPSTREAM_TOKEN`: Bearer token
    /// - `TERMCACHE_UPSTREAM_TIMEOUT_SECS`: Per-request timeout (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_host: std::env::var("TERMCACHE_API_BIND").unwrap_or(defaults.bind_host),
            port: std::env::var("PORT")
                .ok()
                .or_else(|| std::env::var("TERMCACHE_API_PORT").ok())
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.port),
            route_prefix: std::env::var("TERMCACHE_ROUTE_PREFIX")
                .map(|prefix| normalize_prefix(&prefix))
                .unwrap_or(defaults.route_prefix),
            upstream_url: std::env::var("TERMCACHE_UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            upstream_username: std::env::var("TERMCACHE_UPSTREAM_USERNAME").ok(),
            upstream_password: std::env::var("TERMCACHE_UPSTREAM_PASSWORD").ok(),
            upstream_token: std::env::var("TERMCACHE_UPSTREAM_TOKEN").ok(),
            upstream_timeout: std::env::var("TERMCACHE_UPSTREAM_TIMEOUT_SECS")
                .ok()
                .and_then(|value| value.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.upstream_timeout),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ApiResult<()> {
        if !self.route_prefix.starts_with('/') || self.route_prefix.len() < 2 {
            return Err(ApiError::invalid_input(format!(
                "Route prefix must be a non-root path starting with '/': {:?}",
                self.route_prefix
            )));
        }

        if !self.upstream_url.starts_with("http://") && !self.upstream_url.starts_with("https://") {
            return Err(ApiError::invalid_input(format!(
                "Upstream URL must be http(s): {}",
                self.upstream_url
            )));
        }

        if self.upstream_timeout.is_zero() {
            return Err(ApiError::invalid_input("Upstream timeout must be greater than 0"));
        }

        Ok(())
    }

    /// Socket address to bind the HTTP server to.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
    }
}

/// Ensure a leading slash and strip trailing ones.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ApiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.route_prefix, "/transformers/people");
        assert_eq!(
            config.bind_addr().expect("default bind address should parse"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("literal address")
        );
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/transformers/people/"), "/transformers/people");
        assert_eq!(normalize_prefix("transformers/people"), "/transformers/people");
        assert_eq!(normalize_prefix("/"), "/");
    }

    #[test]
    fn test_root_prefix_rejected() {
        let config = ApiConfig {
            route_prefix: "/".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_http_upstream_rejected() {
        let config = ApiConfig {
            upstream_url: "ftp://example.com/terms".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_bind_host() {
        let config = ApiConfig {
            bind_host: "not a host".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.bind_addr().is_err());
    }
}
