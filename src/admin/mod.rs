//! Admin API: inspect replay settings and manage the routing cache.

pub mod auth;
pub mod handlers;

use arc_swap::ArcSwap;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::config::ReplayConfig;
use crate::routing::RoutingCache;

/// State shared by the admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub cache: RoutingCache,
    pub settings: Arc<ArcSwap<ReplayConfig>>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(cache: RoutingCache, settings: Arc<ArcSwap<ReplayConfig>>, api_key: impl Into<Arc<str>>) -> Self {
        Self {
            cache,
            settings,
            api_key: api_key.into(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/apps", get(get_apps))
        .route("/admin/cache", get(get_cache).delete(delete_cache_entry))
        .route("/admin/cache/sweep", post(sweep_cache))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
