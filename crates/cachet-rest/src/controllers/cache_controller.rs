//! Cache administration controller.

use crate::{
    responses::{ok, ApiResult, AppError},
    state::AppState,
};
use cachet_cache::{rule_for, CacheStats, RoutineOutcome};
use cachet_core::CachetError;
use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Body of `POST /invalidate`.
#[derive(Debug, Deserialize)]
pub struct InvalidateTagsRequest {
    pub tags: Vec<String>,
}

/// Number of keys an invalidation removed.
#[derive(Debug, Serialize, Deserialize)]
pub struct InvalidationResponse {
    pub removed: u64,
}

/// Existence check result.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyExistsResponse {
    pub key: String,
    pub exists: bool,
}

/// Delete result.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyDeletedResponse {
    pub key: String,
    pub deleted: bool,
}

/// Summary of a warm-up run.
#[derive(Debug, Serialize)]
pub struct WarmUpResponse {
    pub succeeded: usize,
    pub failed: usize,
    pub entries_written: usize,
    pub routines: Vec<RoutineOutcome>,
}

/// Creates the cache router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/keys/:key", delete(delete_key))
        .route("/keys/:key/exists", get(key_exists))
        .route("/invalidate", post(invalidate_tags))
        .route("/entities/:entity_type/:entity_id/invalidate", post(invalidate_entity))
        .route("/clear", post(clear))
        .route("/warmup", post(warm_up))
}

/// Hit/miss counters and store figures.
async fn stats(State(state): State<AppState>) -> ApiResult<CacheStats> {
    ok(state.cache.stats().await)
}

async fn key_exists(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<KeyExistsResponse> {
    let exists = state.cache.exists(&key).await;
    ok(KeyExistsResponse { key, exists })
}

async fn delete_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<KeyDeletedResponse> {
    debug!("Delete cache key request: {}", key);

    let deleted = state.cache.delete(&key).await;
    ok(KeyDeletedResponse { key, deleted })
}

/// Invalidate every key carrying any of the given tags.
async fn invalidate_tags(
    State(state): State<AppState>,
    Json(request): Json<InvalidateTagsRequest>,
) -> ApiResult<InvalidationResponse> {
    if request.tags.is_empty() {
        return Err(AppError(CachetError::validation("tags must not be empty")));
    }
    if request.tags.iter().any(|tag| tag.trim().is_empty()) {
        return Err(AppError(CachetError::validation("tags must not be blank")));
    }

    let removed = state.cache.invalidate_by_tags(request.tags.as_slice()).await;
    ok(InvalidationResponse { removed })
}

/// Invalidate everything derived from one entity.
async fn invalidate_entity(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> ApiResult<InvalidationResponse> {
    if rule_for(state.cache.rules(), &entity_type).is_none() {
        return Err(AppError(CachetError::not_found("EntityRule", entity_type)));
    }

    let removed = state.cache.invalidate_related(&entity_type, &entity_id).await;
    ok(InvalidationResponse { removed })
}

async fn clear(State(state): State<AppState>) -> ApiResult<bool> {
    info!(namespace = state.cache.key_space().namespace(), "Clear cache request");

    if state.cache.clear().await {
        ok(true)
    } else {
        Err(AppError(CachetError::Unavailable(
            "cache namespace could not be cleared".to_string(),
        )))
    }
}

/// Re-run the warm-up routines.
async fn warm_up(State(state): State<AppState>) -> ApiResult<WarmUpResponse> {
    let report = state.warmup.warm_up().await;
    ok(WarmUpResponse {
        succeeded: report.succeeded(),
        failed: report.failed(),
        entries_written: report.entries_written(),
        routines: report.routines,
    })
}
