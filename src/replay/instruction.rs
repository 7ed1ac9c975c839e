//! Parsing of authority instructions.
//!
//! `fly-replay` carries semicolon-separated `key=value` pairs; only `app`
//! matters for routing. The `fly-replay-cache*` headers describe whether and
//! how long to memoize the decision.

use axum::http::HeaderMap;
use std::collections::HashMap;

use crate::replay::headers::{
    FLY_REPLAY_CACHE, FLY_REPLAY_CACHE_ALLOW_BYPASS, FLY_REPLAY_CACHE_TTL_SECS, INVALIDATE,
    MIN_CACHE_TTL_SECS, YES,
};

/// A parsed `fly-replay` header value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayInstruction {
    fields: HashMap<String, String>,
}

impl ReplayInstruction {
    /// Parse `app=<name>[;<key>=<value>...]`.
    ///
    /// Parts are trimmed; keys are taken verbatim up to the first `=`.
    /// Parts without `=` are ignored and the first occurrence of a key wins.
    pub fn parse(value: &str) -> Self {
        let mut fields = HashMap::new();
        for part in value.split(';') {
            if let Some((key, val)) = part.trim().split_once('=') {
                fields
                    .entry(key.to_string())
                    .or_insert_with(|| val.to_string());
            }
        }
        Self { fields }
    }

    /// Target application name, empty when the instruction has none.
    pub fn app(&self) -> &str {
        self.get("app").unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// What the authority wants done with the routing cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheDirective {
    /// Drop the decision that routes the current path.
    Invalidate,
    /// Remember the decision for paths matching this pattern (host excluded).
    Store(String),
}

/// The caching instruction attached to a replay response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInstruction {
    pub directive: CacheDirective,
    ttl_override: Option<i64>,
    pub allow_bypass: bool,
}

impl CacheInstruction {
    /// Read the caching headers; `None` when no caching was requested.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = header_str(headers, &FLY_REPLAY_CACHE).filter(|v| !v.is_empty())?;

        let directive = if value == INVALIDATE {
            CacheDirective::Invalidate
        } else {
            CacheDirective::Store(value.to_string())
        };

        Some(Self {
            directive,
            ttl_override: header_str(headers, &FLY_REPLAY_CACHE_TTL_SECS)
                .and_then(|v| v.parse::<i64>().ok()),
            allow_bypass: header_str(headers, &FLY_REPLAY_CACHE_ALLOW_BYPASS) == Some(YES),
        })
    }

    /// TTL to store with: the override when it parses and meets the floor,
    /// otherwise `default_secs`.
    pub fn ttl_secs(&self, default_secs: u64) -> u64 {
        match self.ttl_override {
            Some(ttl) if ttl >= MIN_CACHE_TTL_SECS => ttl as u64,
            _ => default_secs,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &axum::http::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
