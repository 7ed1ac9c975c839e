//! Wire-level names and tokens of the replay protocol.

use axum::http::HeaderName;

/// Authority → proxy: serve this request from another app (`app=<name>;...`).
pub const FLY_REPLAY: HeaderName = HeaderName::from_static("fly-replay");
/// Authority → proxy: cache pattern, or [`INVALIDATE`].
pub const FLY_REPLAY_CACHE: HeaderName = HeaderName::from_static("fly-replay-cache");
/// Authority → proxy: TTL override in seconds.
pub const FLY_REPLAY_CACHE_TTL_SECS: HeaderName = HeaderName::from_static("fly-replay-cache-ttl-secs");
/// Authority → proxy: [`YES`] lets clients skip the cached decision.
pub const FLY_REPLAY_CACHE_ALLOW_BYPASS: HeaderName = HeaderName::from_static("fly-replay-cache-allow-bypass");
/// Client → proxy: [`SKIP`] requests a bypass.
pub const FLY_REPLAY_CACHE_CONTROL: HeaderName = HeaderName::from_static("fly-replay-cache-control");
/// Proxy → backend: how the request was routed.
pub const FLY_REPLAY_CACHE_STATUS: HeaderName = HeaderName::from_static("fly-replay-cache-status");
/// Correlation id copied from the authority response onto the backend request.
pub const X_TRACE_ID: HeaderName = HeaderName::from_static("x-trace-id");

pub const INVALIDATE: &str = "invalidate";
pub const YES: &str = "yes";
pub const SKIP: &str = "skip";

/// Overrides below this many seconds are ignored.
pub const MIN_CACHE_TTL_SECS: i64 = 10;

// Debug-mode response headers.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
pub const X_CACHED_APP: HeaderName = HeaderName::from_static("x-cached-app");
pub const X_FORWARDED_TO: HeaderName = HeaderName::from_static("x-forwarded-to");
pub const X_CACHE_ACTION: HeaderName = HeaderName::from_static("x-cache-action");
pub const X_CACHE_PATTERN: HeaderName = HeaderName::from_static("x-cache-pattern");
pub const X_CACHE_ALLOW_BYPASS: HeaderName = HeaderName::from_static("x-cache-allow-bypass");
