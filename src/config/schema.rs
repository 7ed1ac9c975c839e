//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// TTL applied when neither the authority nor the config provides one.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Root configuration for the replay proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Routing authority consulted on cache misses.
    pub authority: AuthorityConfig,

    /// Replay routing and caching behaviour.
    pub replay: ReplayConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Where the routing authority lives.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthorityConfig {
    /// Authority address, bare `host:port` or scheme-qualified.
    pub address: String,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            address: "localhost:8081".to_string(),
        }
    }
}

/// Replay routing settings. Swapped atomically on config reload.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Application name -> where to forward.
    pub apps: HashMap<String, AppConfig>,

    /// Memoize authority decisions in the routing cache.
    pub enable_cache: bool,

    /// Default TTL for cached decisions in seconds (0 = built-in default).
    pub cache_ttl_secs: u64,

    /// Emit diagnostic response headers.
    pub debug: bool,

    /// Largest request or authority response body buffered in memory.
    pub max_body_bytes: usize,

    /// How often expired cache entries are swept.
    pub sweep_interval_secs: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            apps: HashMap::new(),
            enable_cache: false,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            debug: false,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            sweep_interval_secs: 60,
        }
    }
}

impl ReplayConfig {
    /// TTL used when the authority does not supply an acceptable override.
    pub fn default_ttl_secs(&self) -> u64 {
        if self.cache_ttl_secs == 0 {
            DEFAULT_CACHE_TTL_SECS
        } else {
            self.cache_ttl_secs
        }
    }

    /// Resolve an application name to its configured domain.
    pub fn domain_for(&self, app: &str) -> Option<&str> {
        self.apps.get(app).map(|a| a.domain.as_str())
    }
}

/// A single backend application.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Where to forward (e.g., "localhost:9001").
    pub domain: String,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8089".to_string(),
        }
    }
}
