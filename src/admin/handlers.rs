use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::observability::StatsSnapshot;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CacheStatus {
    pub enabled: bool,
    pub name: Option<String>,
    pub entries: usize,
    pub bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct CacheCleared {
    pub cleared: usize,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}

pub async fn get_cache(State(state): State<AppState>) -> Json<CacheStatus> {
    let inner = state.inner.load();
    Json(match &inner.cache {
        Some(cache) => CacheStatus {
            enabled: true,
            name: Some(cache.name().to_string()),
            entries: cache.len(),
            bytes: cache.total_bytes(),
        },
        None => CacheStatus {
            enabled: false,
            name: None,
            entries: 0,
            bytes: 0,
        },
    })
}

pub async fn clear_cache(State(state): State<AppState>) -> Json<CacheCleared> {
    let inner = state.inner.load();
    let cleared = inner.cache.as_ref().map(|c| c.clear()).unwrap_or(0);
    tracing::info!(cleared, "Cache cleared via admin API");
    Json(CacheCleared { cleared })
}
