//! API Handlers
//!
//! HTTP request handlers for each admin endpoint of the request cache.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::cache::RequestCache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, EntryResponse, HealthResponse, InvalidateRequest,
    InvalidateResponse, KeysResponse, SetRequest, SetResponse, StatsResponse, WarmUpResponse,
};
use crate::persistence::FileBackend;

/// Application state shared across all handlers.
///
/// The cache is internally synchronized, so handlers share a plain clone.
#[derive(Clone)]
pub struct AppState {
    pub cache: RequestCache<serde_json::Value>,
}

impl AppState {
    pub fn new(cache: RequestCache<serde_json::Value>) -> Self {
        Self { cache }
    }

    /// Creates the cache from configuration, persisting under
    /// `persistence_dir` when persistence is enabled.
    pub fn from_config(config: &Config) -> Self {
        let backend = FileBackend::new(&config.persistence_dir, &config.cache.persistence_key);
        info!("Persistence slot: {}", backend.path().display());
        let cache = RequestCache::with_backend(config.cache.clone(), Arc::new(backend));
        Self::new(cache)
    }
}

/// Handler for PUT /entries
///
/// Writes an entry directly, without fetching.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let options = req.options();
    let key = state.cache.normalize_key(&req.key);
    state.cache.set(&req.key, req.value, options).await;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /entries/:key
///
/// Inspects an entry without counting a hit or miss. Stale entries are
/// reported with `live: false`.
pub async fn entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<EntryResponse>> {
    let entry = state
        .cache
        .entry(&key)
        .await
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(EntryResponse::from_entry(entry, state.cache.now_ms())))
}

/// Handler for DELETE /entries/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.cache.delete(&key).await {
        return Err(CacheError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /entries
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear().await;
    Json(ClearResponse::new())
}

/// Handler for GET /keys
pub async fn keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    Json(KeysResponse::new(state.cache.keys().await))
}

/// Handler for POST /invalidate
///
/// Removes every key matching the regular expression in the body.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    let removed = state.cache.invalidate_pattern(&req.pattern).await?;

    Ok(Json(InvalidateResponse {
        pattern: req.pattern,
        removed,
    }))
}

/// Handler for POST /warmup
///
/// Seeds the cache with a batch of entries. The batch is rejected whole if
/// any item is invalid.
pub async fn warm_up_handler(
    State(state): State<AppState>,
    Json(reqs): Json<Vec<SetRequest>>,
) -> Result<Json<WarmUpResponse>> {
    if let Some(error_msg) = reqs.iter().find_map(SetRequest::validate) {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let count = reqs.len();
    let entries = reqs
        .into_iter()
        .map(SetRequest::into_warm_up_entry)
        .collect();
    state.cache.warm_up(entries).await;

    Ok(Json(WarmUpResponse { count }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats().await))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
