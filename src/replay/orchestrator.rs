//! Per-request replay state machine.
//!
//! ```text
//! Start ──▶ CacheCheck ──hit──────────────────────────────▶ Forwarded
//!              │ miss / bypass / unknown cached target
//!              ▼
//!           Delegate ──error──▶ (propagated)
//!              ▼
//!       InstructionCheck ──no fly-replay──▶ DirectResponse
//!              ▼
//!       CacheInstruction ──▶ Propagate ──▶ Forward ──▶ Forwarded | BadGateway
//! ```
//!
//! Steps of one request run strictly in order. The routing cache is the only
//! state shared between requests.

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::config::ReplayConfig;
use crate::http::request::{BufferedRequest, RequestIdExt};
use crate::http::response::{ClientResponse, InterceptedResponse, ResponseSink};
use crate::http::upstream::{normalize_address, Forwarder};
use crate::observability::metrics;
use crate::replay::authority::Authority;
use crate::replay::error::ReplayError;
use crate::replay::headers::*;
use crate::replay::instruction::{CacheDirective, CacheInstruction, ReplayInstruction};
use crate::routing::RoutingCache;

/// How a request was routed, as reported to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Bypass => "bypass",
        }
    }

    fn debug_value(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        }
    }
}

/// Outcome of consulting the cache.
enum CacheCheck {
    /// Serve from the cached decision.
    Serve { target: String, domain: String },
    /// Ask the authority.
    Delegate(CacheStatus),
}

/// Debug response headers, collected only when debug mode is on.
struct Diagnostics(Option<HeaderMap>);

impl Diagnostics {
    fn new(enabled: bool) -> Self {
        Self(enabled.then(HeaderMap::new))
    }

    fn set(&mut self, name: HeaderName, value: &str) {
        if let (Some(headers), Ok(value)) = (self.0.as_mut(), HeaderValue::from_str(value)) {
            headers.insert(name, value);
        }
    }

    fn apply(self, target: &mut HeaderMap) {
        if let Some(headers) = self.0 {
            target.extend(headers);
        }
    }
}

/// Sequences cache lookup, authority delegation, cache mutation and forwarding.
pub struct ReplayOrchestrator {
    settings: Arc<ArcSwap<ReplayConfig>>,
    cache: RoutingCache,
    forwarder: Forwarder,
}

impl ReplayOrchestrator {
    pub fn new(settings: Arc<ArcSwap<ReplayConfig>>, cache: RoutingCache, forwarder: Forwarder) -> Self {
        Self {
            settings,
            cache,
            forwarder,
        }
    }

    /// Current replay settings snapshot.
    pub fn settings(&self) -> Arc<ReplayConfig> {
        self.settings.load_full()
    }

    pub fn cache(&self) -> &RoutingCache {
        &self.cache
    }

    /// Run one request through the replay pipeline.
    pub async fn handle<A>(&self, request: Request<Body>, authority: &mut A) -> Result<Response, ReplayError>
    where
        A: Authority + ?Sized,
    {
        let settings = self.settings.load_full();
        let request_id = request.request_id().to_string();
        let method = request.method().to_string();

        // Start: the body is read exactly once.
        let mut request = BufferedRequest::read(request, settings.max_body_bytes)
            .await
            .map_err(ReplayError::Body)?;
        let full_path = request.full_path();
        let mut diagnostics = Diagnostics::new(settings.debug);

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            full_path = %full_path,
            "Replay request received"
        );

        // CacheCheck
        let cache_status = if settings.enable_cache {
            match self.check_cache(&settings, &request, &full_path, &request_id) {
                CacheCheck::Serve { target, domain } => {
                    diagnostics.set(X_CACHE, CacheStatus::Hit.debug_value());
                    diagnostics.set(X_CACHED_APP, &target);
                    set_cache_status(&mut request.headers, Some(CacheStatus::Hit));

                    let response = self.forward(&domain, &request, diagnostics).await?;
                    metrics::record_request(&method, "cache_hit", response.status().as_u16());
                    return Ok(response);
                }
                CacheCheck::Delegate(status) => {
                    diagnostics.set(X_CACHE, status.debug_value());
                    Some(status)
                }
            }
        } else {
            None
        };

        // Delegate
        let mut intercepted = InterceptedResponse::new(settings.max_body_bytes);
        authority.delegate(&request, &mut intercepted).await?;

        // InstructionCheck
        let instruction = match intercepted.header_str(FLY_REPLAY.as_str()).filter(|v| !v.is_empty()) {
            Some(value) => ReplayInstruction::parse(value),
            None => {
                tracing::debug!(
                    request_id = %request_id,
                    status = %intercepted.status(),
                    "No replay instruction, returning authority response"
                );
                let mut client = ClientResponse::new();
                diagnostics.apply(client.headers_mut());
                intercepted.flush(&mut client)?;
                let response = client.into_response();
                metrics::record_request(&method, "direct", response.status().as_u16());
                return Ok(response);
            }
        };
        let app = instruction.app().to_string();

        // CacheInstruction
        if settings.enable_cache {
            if let Some(cache_instruction) = CacheInstruction::from_headers(intercepted.headers()) {
                self.apply_cache_instruction(
                    &settings,
                    &cache_instruction,
                    &request,
                    &full_path,
                    &app,
                    &request_id,
                    &mut diagnostics,
                );
            }
        }

        // Propagate
        if let Some(trace_id) = intercepted.headers().get(X_TRACE_ID) {
            request.headers.insert(X_TRACE_ID, trace_id.clone());
        }
        set_cache_status(&mut request.headers, cache_status);

        // Forward
        match settings.domain_for(&app) {
            Some(domain) => {
                tracing::debug!(request_id = %request_id, app = %app, domain = %domain, "Replaying request");
                let response = self.forward(domain, &request, diagnostics).await?;
                metrics::record_request(&method, "replayed", response.status().as_u16());
                Ok(response)
            }
            None => {
                tracing::warn!(request_id = %request_id, app = %app, "Replay target is not configured");
                let mut response =
                    (StatusCode::BAD_GATEWAY, format!("unknown app: {}", app)).into_response();
                diagnostics.apply(response.headers_mut());
                metrics::record_request(&method, "unknown_app", StatusCode::BAD_GATEWAY.as_u16());
                Ok(response)
            }
        }
    }

    fn check_cache(
        &self,
        settings: &ReplayConfig,
        request: &BufferedRequest,
        full_path: &str,
        request_id: &str,
    ) -> CacheCheck {
        let Some(entry) = self.cache.lookup(full_path) else {
            metrics::record_cache_lookup("miss");
            return CacheCheck::Delegate(CacheStatus::Miss);
        };

        let skip_requested = request
            .headers
            .get(FLY_REPLAY_CACHE_CONTROL)
            .is_some_and(|v| v == SKIP);
        if entry.allow_bypass && skip_requested {
            tracing::debug!(request_id = %request_id, pattern = %entry.pattern, "Client bypassed cached route");
            metrics::record_cache_lookup("bypass");
            return CacheCheck::Delegate(CacheStatus::Bypass);
        }

        match settings.domain_for(&entry.target) {
            Some(domain) => {
                tracing::debug!(
                    request_id = %request_id,
                    pattern = %entry.pattern,
                    target = %entry.target,
                    "Cache hit"
                );
                metrics::record_cache_lookup("hit");
                CacheCheck::Serve {
                    target: entry.target,
                    domain: domain.to_string(),
                }
            }
            None => {
                // The app table changed since the decision was cached; ask again.
                tracing::warn!(
                    request_id = %request_id,
                    pattern = %entry.pattern,
                    target = %entry.target,
                    "Cached target is not configured, consulting authority"
                );
                metrics::record_cache_lookup("miss");
                CacheCheck::Delegate(CacheStatus::Miss)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_cache_instruction(
        &self,
        settings: &ReplayConfig,
        instruction: &CacheInstruction,
        request: &BufferedRequest,
        full_path: &str,
        app: &str,
        request_id: &str,
        diagnostics: &mut Diagnostics,
    ) {
        match &instruction.directive {
            CacheDirective::Invalidate => {
                let removed = self.cache.invalidate_path(full_path);
                tracing::info!(request_id = %request_id, full_path = %full_path, removed, "Cache invalidated");
                diagnostics.set(X_CACHE_ACTION, "INVALIDATED");
            }
            CacheDirective::Store(pattern) => {
                let key = format!("{}{}", request.host(), pattern);
                let ttl = instruction.ttl_secs(settings.default_ttl_secs());
                self.cache.store(full_path, &key, app, ttl, instruction.allow_bypass);
                tracing::info!(
                    request_id = %request_id,
                    pattern = %key,
                    app = %app,
                    ttl_secs = ttl,
                    allow_bypass = instruction.allow_bypass,
                    "Cached routing decision"
                );
                diagnostics.set(X_CACHE_ACTION, "STORED");
                diagnostics.set(X_CACHE_PATTERN, &key);
                diagnostics.set(X_CACHE_ALLOW_BYPASS, if instruction.allow_bypass { YES } else { "no" });
            }
        }
    }

    async fn forward(
        &self,
        domain: &str,
        request: &BufferedRequest,
        mut diagnostics: Diagnostics,
    ) -> Result<Response, ReplayError> {
        diagnostics.set(X_FORWARDED_TO, &normalize_address(domain));
        let mut response = self.forwarder.forward(domain, request).await?;
        diagnostics.apply(response.headers_mut());
        Ok(response)
    }
}

/// Set or clear the routing marker the backend sees.
fn set_cache_status(headers: &mut HeaderMap, status: Option<CacheStatus>) {
    match status {
        Some(status) => {
            headers.insert(FLY_REPLAY_CACHE_STATUS, HeaderValue::from_static(status.as_str()));
        }
        None => {
            headers.remove(FLY_REPLAY_CACHE_STATUS);
        }
    }
}
