//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the replay handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Own the routing cache and the hot-swappable replay settings
//! - Spawn background tasks (cache sweeper, config reload, admin API)
//! - Serve until shutdown

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::{ProxyConfig, ReplayConfig};
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::http::upstream::Forwarder;
use crate::replay::{ReplayError, ReplayOrchestrator, UpstreamAuthority};
use crate::routing::{CacheSweeper, RoutingCache};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ReplayOrchestrator>,
    pub authority: UpstreamAuthority,
}

/// HTTP server for the replay proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    settings: Arc<ArcSwap<ReplayConfig>>,
    cache: RoutingCache,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let settings = Arc::new(ArcSwap::from_pointee(config.replay.clone()));
        let cache = RoutingCache::new();
        let forwarder = Forwarder::new(Duration::from_secs(config.timeouts.connect_secs));

        let orchestrator = Arc::new(ReplayOrchestrator::new(
            settings.clone(),
            cache.clone(),
            forwarder.clone(),
        ));
        let authority = UpstreamAuthority::new(
            forwarder,
            config.authority.address.clone(),
            config.replay.max_body_bytes,
        );

        let state = AppState {
            orchestrator,
            authority,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            settings,
            cache,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            authority = %self.config.authority.address,
            apps = self.config.replay.apps.len(),
            enable_cache = self.config.replay.enable_cache,
            "HTTP server starting"
        );

        // Caching can be switched on by a reload, so the sweeper always runs.
        let sweeper = CacheSweeper::new(
            self.cache.clone(),
            Duration::from_secs(self.config.replay.sweep_interval_secs.max(1)),
        );
        tokio::spawn(sweeper.run(shutdown.resubscribe()));

        // Replay settings follow the config file; everything else needs a restart.
        let settings = self.settings.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(new_config) => {
                            tracing::info!(apps = new_config.replay.apps.len(), "Replay settings reloaded");
                            settings.store(Arc::new(new_config.replay));
                        }
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        if self.config.admin.enabled {
            let admin_state = AdminState::new(
                self.cache.clone(),
                self.settings.clone(),
                self.config.admin.api_key.clone(),
            );
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");

            let mut admin_shutdown = shutdown.resubscribe();
            let admin_router = setup_admin_router(admin_state);
            tokio::spawn(async move {
                let served = axum::serve(admin_listener, admin_router)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = served {
                    tracing::error!(error = %e, "Admin server failed");
                }
            });
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The routing cache shared by every request.
    pub fn cache(&self) -> &RoutingCache {
        &self.cache
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler: replay through the configured authority.
async fn proxy_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response, ReplayError> {
    let body_limit = state.orchestrator.settings().max_body_bytes;
    let mut authority = state.authority.with_body_limit(body_limit);
    state.orchestrator.handle(request, &mut authority).await
}
