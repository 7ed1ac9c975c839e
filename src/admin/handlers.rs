use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::admin::AdminState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub cache_enabled: bool,
    pub debug: bool,
    pub cache_entries: usize,
}

#[derive(Serialize)]
pub struct AppStatus {
    pub name: String,
    pub domain: String,
}

#[derive(Serialize)]
pub struct CacheEntryStatus {
    pub key: String,
    pub source_path: String,
    pub target: String,
    pub allow_bypass: bool,
    /// Zero for entries that expired but were not swept yet.
    pub expires_in_secs: u64,
}

#[derive(Deserialize)]
pub struct InvalidateParams {
    pub key: String,
}

#[derive(Serialize)]
pub struct InvalidateResult {
    pub key: String,
    pub removed: bool,
}

#[derive(Serialize)]
pub struct SweepResult {
    pub removed: usize,
    pub remaining: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let settings = state.settings.load();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        cache_enabled: settings.enable_cache,
        debug: settings.debug,
        cache_entries: state.cache.len(),
    })
}

pub async fn get_apps(State(state): State<AdminState>) -> Json<Vec<AppStatus>> {
    let settings = state.settings.load();
    let mut apps: Vec<AppStatus> = settings
        .apps
        .iter()
        .map(|(name, app)| AppStatus {
            name: name.clone(),
            domain: app.domain.clone(),
        })
        .collect();
    apps.sort_by(|a, b| a.name.cmp(&b.name));
    Json(apps)
}

pub async fn get_cache(State(state): State<AdminState>) -> Json<Vec<CacheEntryStatus>> {
    let now = Instant::now();
    let entries = state
        .cache
        .entries()
        .into_iter()
        .map(|entry| CacheEntryStatus {
            expires_in_secs: entry.remaining_at(now).as_secs(),
            key: entry.pattern,
            source_path: entry.source_path,
            target: entry.target,
            allow_bypass: entry.allow_bypass,
        })
        .collect();
    Json(entries)
}

pub async fn delete_cache_entry(
    State(state): State<AdminState>,
    Query(params): Query<InvalidateParams>,
) -> (StatusCode, Json<InvalidateResult>) {
    let removed = state.cache.invalidate(&params.key);
    if removed {
        tracing::info!(key = %params.key, "Cache entry invalidated via admin API");
    }
    let status = if removed { StatusCode::OK } else { StatusCode::NOT_FOUND };
    (
        status,
        Json(InvalidateResult {
            key: params.key,
            removed,
        }),
    )
}

pub async fn sweep_cache(State(state): State<AdminState>) -> Json<SweepResult> {
    let removed = state.cache.sweep();
    tracing::info!(removed, "Cache swept via admin API");
    Json(SweepResult {
        removed,
        remaining: state.cache.len(),
    })
}
