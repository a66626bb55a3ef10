//! Login, callback and refresh handlers
//!
//! - GET  /auth/login   : mint state, remember it, return the consent URL
//! - GET  /auth/callback: validate state, exchange the code, fetch the profile
//! - POST /auth/refresh : trade a refresh token for a new access token
//!
//! The state travels twice: inside the consent URL and in an HttpOnly cookie.
//! The callback compares the two, then consumes the server-side pending entry
//! so each state completes at most one login within its TTL.

use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use spotify_api::call_with_retry;
use spotify_auth::{TokenSet, exchange_code, generate_state, refresh_token, validate_state};
use tracing::{info, warn};

use crate::AppState;
use crate::error::Error;
use crate::metrics;
use crate::session::Pending;

pub const STATE_COOKIE: &str = "spotify_auth_state";

/// Enough of a state to correlate log lines without making it replayable.
fn state_prefix(state: &str) -> &str {
    match state.char_indices().nth(8) {
        Some((end, _)) => &state[..end],
        None => state,
    }
}

fn state_cookie(value: &str, max_age: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{STATE_COOKIE}={value}; Path=/auth; Max-Age={}; HttpOnly; SameSite=Lax",
        max_age.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

/// Token fields as returned to the caller. `refresh_token` is null when the
/// provider did not send one.
fn token_fields(tokens: &TokenSet) -> serde_json::Map<String, serde_json::Value> {
    let mut fields = serde_json::Map::new();
    fields.insert("access_token".into(), tokens.access_token.clone().into());
    fields.insert(
        "refresh_token".into(),
        tokens.refresh_token.clone().into(),
    );
    fields.insert("token_type".into(), tokens.token_type.clone().into());
    fields.insert("expires_in".into(), tokens.expires_in.into());
    fields.insert("expires_at".into(), tokens.expires_at.into());
    fields.insert("scope".into(), tokens.scope.clone().into());
    fields
}

/// GET /auth/login
pub async fn login(State(state): State<AppState>) -> Response {
    let auth_state = generate_state();
    let auth_url = state.client.authorization_url(&auth_state);
    state.pending.insert(auth_state.clone()).await;

    metrics::record_login();
    info!(state_prefix = state_prefix(&auth_state), "login started");

    let cookie = state_cookie(&auth_state, state.state_ttl, state.secure_cookies);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::SET_COOKIE, cookie),
        ],
        serde_json::json!({
            "auth_url": auth_url,
            "state": auth_state,
        })
        .to_string(),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// GET /auth/callback?code&state&error
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Response, Error> {
    if let Some(provider_error) = params.error {
        metrics::record_callback("provider_error");
        return Err(Error::ProviderDenied(provider_error));
    }

    let received = params.state.unwrap_or_default();
    let expected = cookie_value(&headers, STATE_COOKIE).unwrap_or_default();
    if received.is_empty() || expected.is_empty() || !validate_state(&received, expected) {
        metrics::record_callback("state_mismatch");
        warn!(
            state_prefix = state_prefix(&received),
            has_cookie = !expected.is_empty(),
            "callback state mismatch"
        );
        return Err(spotify_auth::Error::StateMismatch.into());
    }

    match state.pending.consume(&received).await {
        Pending::Valid => {}
        outcome => {
            metrics::record_callback("login_expired");
            warn!(state_prefix = state_prefix(&received), ?outcome, "callback state not pending");
            return Err(Error::LoginExpired);
        }
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or(Error::MissingParameter("code"))?;

    let started = Instant::now();
    let exchanged = exchange_code(&state.http, &state.client, &code).await;
    metrics::record_provider_duration("token_exchange", started.elapsed().as_secs_f64());
    let tokens = match exchanged {
        Ok(tokens) => {
            metrics::record_token_request("authorization_code", "success");
            tokens
        }
        Err(e) => {
            metrics::record_token_request("authorization_code", "failure");
            metrics::record_callback("exchange_failed");
            return Err(e.into());
        }
    };

    let started = Instant::now();
    let profile = call_with_retry(&state.retry, || {
        state.resource.current_user(&tokens.access_token)
    })
    .await;
    metrics::record_provider_duration("profile", started.elapsed().as_secs_f64());

    let mut body = token_fields(&tokens);
    body.insert("success".into(), true.into());
    match profile {
        Ok(profile) => {
            info!(user_id = %profile.id, "login completed");
            body.insert("user".into(), serde_json::to_value(&profile).unwrap_or_default());
            metrics::record_callback("success");
        }
        Err(e) => {
            warn!(error = %e, "login completed but profile fetch failed");
            body.insert("user".into(), serde_json::Value::Null);
            body.insert("profile_error".into(), e.to_string().into());
            metrics::record_callback("success_without_profile");
        }
    }

    let mut response = json_response(StatusCode::OK, body.into());
    let cleared = state_cookie("", Duration::ZERO, state.secure_cookies);
    if let Ok(value) = cleared.parse() {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    refresh_token: String,
}

/// POST /auth/refresh {"refresh_token": "..."}
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Response, Error> {
    if request.refresh_token.trim().is_empty() {
        return Err(Error::MissingParameter("refresh_token"));
    }

    let _permit = state
        .refreshes
        .acquire(&request.refresh_token)
        .ok_or(Error::RefreshInFlight)?;

    let started = Instant::now();
    let refreshed = refresh_token(&state.http, &state.client, &request.refresh_token).await;
    metrics::record_provider_duration("token_refresh", started.elapsed().as_secs_f64());

    match refreshed {
        Ok(tokens) => {
            metrics::record_token_request("refresh_token", "success");
            info!(
                rotated = tokens.refresh_token.is_some(),
                expires_in = tokens.expires_in,
                "access token refreshed"
            );
            let mut body = token_fields(&tokens);
            body.insert("success".into(), true.into());
            Ok(json_response(StatusCode::OK, body.into()))
        }
        Err(e) => {
            metrics::record_token_request("refresh_token", "failure");
            Err(e.into())
        }
    }
}
