//! GET /resource/playlists: the caller's playlists, fetched with their token

use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use spotify_api::{ApiErrorKind, call_with_retry};

use crate::AppState;
use crate::error::Error;
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct PlaylistParams {
    access_token: Option<String>,
    limit: Option<u32>,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn outcome(kind: &ApiErrorKind) -> &'static str {
    match kind {
        ApiErrorKind::Unauthorized => "unauthorized",
        ApiErrorKind::Forbidden => "forbidden",
        ApiErrorKind::RateLimited { .. } => "rate_limited",
        ApiErrorKind::UpstreamUnavailable => "upstream_unavailable",
        ApiErrorKind::Rejected => "rejected",
        ApiErrorKind::MalformedResponse => "malformed_response",
    }
}

pub async fn playlists(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<PlaylistParams>,
) -> Result<Response, Error> {
    let access_token = params
        .access_token
        .filter(|t| !t.trim().is_empty())
        .or_else(|| bearer_token(&headers))
        .ok_or(Error::MissingAccessToken)?;
    let limit = params.limit.unwrap_or(state.playlist_limit);

    let started = Instant::now();
    let result = call_with_retry(&state.retry, || {
        state.resource.current_user_playlists(&access_token, limit)
    })
    .await;
    metrics::record_provider_duration("playlists", started.elapsed().as_secs_f64());

    let page = match result {
        Ok(page) => page,
        Err(e) => {
            metrics::record_resource_request(outcome(&e.kind));
            return Err(e.into());
        }
    };
    metrics::record_resource_request("success");

    let body = serde_json::json!({
        "success": true,
        "count": page.items.len(),
        "total": page.total,
        "items": page.items,
    });
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response())
}
