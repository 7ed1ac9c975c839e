//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every configured app must carry a parseable domain
//! - Authority and bind addresses must parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::http::upstream::parse_target;

/// A single semantic problem found in a config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("app {app} must have a domain")]
    MissingDomain { app: String },

    #[error("app {app} has an invalid domain '{domain}'")]
    InvalidDomain { app: String, domain: String },

    /// The forwarder speaks plain HTTP only.
    #[error("{field} '{address}' uses https, which is not supported")]
    UnsupportedScheme { field: String, address: String },

    #[error("invalid authority address '{0}'")]
    InvalidAuthority(String),

    #[error("invalid {field} '{value}'")]
    InvalidBindAddress { field: &'static str, value: String },

    #[error("replay.sweep_interval_secs must be greater than zero")]
    ZeroSweepInterval,
}

/// Validate a parsed config, collecting every error.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut apps: Vec<_> = config.replay.apps.iter().collect();
    apps.sort_by(|a, b| a.0.cmp(b.0));
    for (name, app) in apps {
        if app.domain.trim().is_empty() {
            errors.push(ValidationError::MissingDomain { app: name.clone() });
        } else {
            match parse_target(&app.domain) {
                Ok(url) if url.scheme() != "http" => errors.push(ValidationError::UnsupportedScheme {
                    field: format!("replay.apps.{}.domain", name),
                    address: app.domain.clone(),
                }),
                Ok(_) => {}
                Err(_) => errors.push(ValidationError::InvalidDomain {
                    app: name.clone(),
                    domain: app.domain.clone(),
                }),
            }
        }
    }

    match parse_target(&config.authority.address) {
        Ok(url) if url.scheme() != "http" => errors.push(ValidationError::UnsupportedScheme {
            field: "authority.address".to_string(),
            address: config.authority.address.clone(),
        }),
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::InvalidAuthority(config.authority.address.clone())),
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.admin.enabled && config.admin.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress {
            field: "admin.bind_address",
            value: config.admin.bind_address.clone(),
        });
    }

    if config.replay.enable_cache && config.replay.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroSweepInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
