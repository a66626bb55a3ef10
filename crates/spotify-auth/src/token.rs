//! OAuth token exchange and refresh
//!
//! Handles the two token endpoint interactions:
//! 1. Authorization code exchange (completion of the login flow)
//! 2. Token refresh (renewing an expired access token)
//!
//! Both POST to `Endpoints::token` with different grant types and exactly one
//! request each. A rejected grant is returned to the caller, never retried:
//! an authorization code is single-use and a refresh token may be rotated.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::{ClientAuth, ClientConfig, require_secure};
use crate::error::{Error, Result};
use crate::provider_error::provider_message;

/// Tokens returned by the token endpoint, owned by whoever asked for them.
///
/// `expires_at` is an absolute unix timestamp in seconds, computed from
/// `expires_in` when the response was parsed. `refresh_token` is `None` when a
/// refresh response did not rotate it; merging with the previous value is the
/// caller's decision (see `merge_refresh`).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    pub scope: String,
    pub expires_at: u64,
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl TokenSet {
    /// True once the access token has passed its expiry instant.
    pub fn is_expired(&self) -> bool {
        self.expires_within(Duration::ZERO)
    }

    /// True if the access token expires within `window` from now.
    pub fn expires_within(&self, window: Duration) -> bool {
        unix_now().saturating_add(window.as_secs()) >= self.expires_at
    }

    /// Keep `previous` as the refresh token when the provider did not send a new one.
    pub fn merge_refresh(mut self, previous: &str) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token = Some(previous.to_string());
        }
        self
    }

    fn from_response(raw: RawTokenResponse, now: u64) -> Result<Self> {
        let access_token = raw
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::MalformedResponse("missing access_token".into()))?;
        let expires_in = raw
            .expires_in
            .ok_or_else(|| Error::MalformedResponse("missing expires_in".into()))?;

        Ok(Self {
            access_token,
            token_type: raw.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_in,
            refresh_token: raw.refresh_token,
            scope: raw.scope.unwrap_or_default(),
            expires_at: now.saturating_add(expires_in),
        })
    }
}

/// Token endpoint body as sent by the provider. Every field is optional here
/// so that a missing field becomes `MalformedResponse` rather than an opaque
/// deserialization error.
#[derive(Debug, Deserialize)]
struct RawTokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<u64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Grant {
    AuthorizationCode,
    RefreshToken,
}

impl Grant {
    fn as_str(self) -> &'static str {
        match self {
            Grant::AuthorizationCode => "authorization_code",
            Grant::RefreshToken => "refresh_token",
        }
    }

    fn rejected(self, status: u16, message: String) -> Error {
        match self {
            Grant::AuthorizationCode => Error::Exchange { status, message },
            Grant::RefreshToken => Error::Refresh { status, message },
        }
    }
}

/// Exchange an authorization code for tokens.
///
/// Call only after the callback state has been validated. The code is
/// single-use: on any failure the caller has to restart the login.
///
/// `client` must not follow redirects (see `http::http_client`); a redirecting
/// client would re-post the code to an endpoint nobody validated.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &ClientConfig,
    code: &str,
) -> Result<TokenSet> {
    post_token_request(
        client,
        config,
        Grant::AuthorizationCode,
        &[("code", code), ("redirect_uri", config.redirect_uri.as_str())],
    )
    .await
}

/// Trade a refresh token for a new access token.
///
/// A rejection (expired or revoked refresh token) is terminal: the caller must
/// send the user back through the authorization URL.
pub async fn refresh_token(
    client: &reqwest::Client,
    config: &ClientConfig,
    refresh_token: &str,
) -> Result<TokenSet> {
    post_token_request(
        client,
        config,
        Grant::RefreshToken,
        &[("refresh_token", refresh_token)],
    )
    .await
}

#[instrument(skip_all, fields(grant = grant.as_str()))]
async fn post_token_request(
    client: &reqwest::Client,
    config: &ClientConfig,
    grant: Grant,
    params: &[(&str, &str)],
) -> Result<TokenSet> {
    let endpoint = &config.endpoints.token;
    require_secure("token_url", endpoint)?;

    let mut form: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 3);
    form.push(("grant_type", grant.as_str()));
    form.extend_from_slice(params);

    let mut request = client.post(endpoint.clone());
    match config.client_auth {
        ClientAuth::Basic => {
            request = request.basic_auth(&config.client_id, Some(config.client_secret.expose()));
        }
        ClientAuth::Body => {
            form.push(("client_id", config.client_id.as_str()));
            form.push(("client_secret", config.client_secret.expose().as_str()));
        }
    }

    let response = request
        .form(&form)
        .send()
        .await
        .map_err(transport_error)?;

    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if status.is_redirection() {
        warn!(status = status.as_u16(), "token endpoint redirected, not following");
        return Err(grant.rejected(
            status.as_u16(),
            format!("token endpoint redirected ({status}); redirects are not followed"),
        ));
    }

    if !status.is_success() {
        let message = provider_message(&body)
            .unwrap_or_else(|| format!("token endpoint returned {status}"));
        warn!(status = status.as_u16(), error = %message, "token endpoint rejected grant");
        return Err(grant.rejected(status.as_u16(), message));
    }

    let raw: RawTokenResponse = serde_json::from_str(&body)
        .map_err(|e| Error::MalformedResponse(format!("token response is not valid JSON: {e}")))?;
    let tokens = TokenSet::from_response(raw, unix_now())?;

    debug!(
        expires_in = tokens.expires_in,
        rotated_refresh_token = tokens.refresh_token.is_some(),
        "token endpoint issued tokens"
    );
    Ok(tokens)
}

fn transport_error(e: reqwest::Error) -> Error {
    // Strip the URL so query strings never reach logs or responses.
    let e = e.without_url();
    if e.is_timeout() {
        Error::Timeout(format!("token endpoint: {e}"))
    } else {
        Error::Http(format!("token endpoint: {e}"))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
