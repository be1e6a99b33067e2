//! Unauthenticated inline preview rendering.
//!
//! Serves the fallback path: the diagram source arrives url-encoded in the
//! query string and the rendered image is returned directly, never
//! persisted. Responses advertise the configured freshness window, and a
//! process-local cache keyed by the exact source text absorbs repeat
//! renders within that window — time is the only invalidation trigger.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::debug;

use crate::AppState;
use crate::errors::Result;

#[derive(Debug, Deserialize)]
pub struct PreviewParams {
    /// Url-encoded diagram source
    pub body: String,
}

#[tracing::instrument(skip_all)]
pub async fn preview_png(State(state): State<AppState>, Query(params): Query<PreviewParams>) -> Result<Response> {
    let artifact = match state.preview_cache.get(&params.body).await {
        Some(cached) => {
            debug!("Preview cache hit");
            cached
        }
        None => {
            debug!("Preview cache miss, rendering");
            let artifact = state.renderer.render(&params.body).await?;
            // Only successful renders are cached, so a corrected diagram
            // re-renders immediately instead of serving a stale failure.
            state.preview_cache.insert(params.body.clone(), artifact.clone()).await;
            artifact
        }
    };

    let cache_control = format!("public, max-age={}", state.config.preview_cache.ttl.as_secs());
    Ok((
        [
            (header::CONTENT_TYPE, artifact.content_type.clone()),
            (header::CACHE_CONTROL, cache_control),
        ],
        artifact.bytes,
    )
        .into_response())
}
