//! Bearer-authenticated calls to the Web API
//!
//! `ResourceClient` attaches the caller's access token to a single request,
//! classifies the outcome, and hands back the JSON payload. It never retries
//! and never refreshes: a 401 means the caller must obtain a new token (see
//! `retry::call_with_retry` for opt-in retries of transient failures).

use reqwest::Method;
use reqwest::header::RETRY_AFTER;
use serde_json::Value;
use spotify_auth::{ClientConfig, provider_message, require_secure};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::classify::{classify_status, parse_retry_after};
use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct ResourceClient {
    http: reqwest::Client,
    base: Url,
}

impl ResourceClient {
    /// Wrap `http` for calls below `base`. Plaintext bases are refused unless loopback.
    ///
    /// `http` should come from `spotify_auth::http_client`: redirects are not
    /// followed, and a 3xx surfaces as a `Rejected` error carrying its status.
    pub fn new(http: reqwest::Client, base: Url) -> common::Result<Self> {
        require_secure("api_base_url", &base)?;
        Ok(Self { http, base })
    }

    pub fn from_config(http: reqwest::Client, config: &ClientConfig) -> common::Result<Self> {
        Self::new(http, config.endpoints.resource_base.clone())
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Send one request to `path` (relative to the base) with `access_token`
    /// as bearer credential.
    ///
    /// 2xx yields the JSON payload (`Value::Null` for an empty body). Every
    /// other outcome is an `ApiError` classified by status.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        access_token: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ApiError> {
        self.send(method, path, access_token, query, None).await
    }

    /// Like `call`, with a JSON request body.
    pub async fn call_json(
        &self,
        method: Method,
        path: &str,
        access_token: &str,
        body: &Value,
    ) -> Result<Value, ApiError> {
        self.send(method, path, access_token, &[], Some(body)).await
    }

    #[instrument(skip_all, fields(method = %method, path = %path))]
    async fn send(
        &self,
        method: Method,
        path: &str,
        access_token: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.endpoint(path, query)?;

        let mut request = self.http.request(method, url).bearer_auth(access_token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ApiError::transport)?;
        let status = response.status();
        let retry_after = parse_retry_after(
            response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
        );
        let text = response.text().await.map_err(ApiError::transport)?;

        if status.is_success() {
            debug!(status = status.as_u16(), "resource call succeeded");
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text)
                .map_err(|e| ApiError::malformed(Some(status.as_u16()), e));
        }

        let kind = classify_status(status.as_u16(), retry_after);
        let message = provider_message(&text)
            .unwrap_or_else(|| format!("resource API returned {status}"));
        warn!(status = status.as_u16(), kind = %kind, error = %message, "resource call failed");
        Err(ApiError::new(kind, Some(status.as_u16()), message))
    }

    /// Join `path` onto the base, keeping the base's own path segments (`/v1`).
    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let joined = format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined).map_err(|e| {
            ApiError::new(
                crate::error::ApiErrorKind::Rejected,
                None,
                format!("invalid resource path {path}: {e}"),
            )
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().copied());
        }
        Ok(url)
    }
}
