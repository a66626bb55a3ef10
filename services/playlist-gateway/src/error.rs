//! Service-specific error types
//!
//! Every handler failure becomes a JSON body of the form
//! `{"success":false,"error":"...","status_code":400,"request_id":"req_...","reauthorize":false}`.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use spotify_api::ApiError;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum Error {
    /// The provider redirected back with `error=...` (e.g. the user denied consent).
    #[error("{0}")]
    ProviderDenied(String),

    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("login expired or already completed, start again at /auth/login")]
    LoginExpired,

    #[error("a refresh with this token is already in progress")]
    RefreshInFlight,

    #[error("missing access token (query parameter or Authorization: Bearer)")]
    MissingAccessToken,

    #[error(transparent)]
    Auth(#[from] spotify_auth::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        let code = match self {
            Error::ProviderDenied(_) | Error::MissingParameter(_) | Error::LoginExpired => 400,
            Error::RefreshInFlight => 409,
            Error::MissingAccessToken => 401,
            Error::Auth(e) => e.status_code(),
            Error::Api(e) => e.status_code(),
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            Error::Api(e) => e.retry_after(),
            _ => None,
        }
    }

    /// The client has to go back through `/auth/login`.
    pub fn reauthorize(&self) -> bool {
        match self {
            Error::LoginExpired => true,
            Error::Auth(e) => e.requires_reauthorization(),
            _ => false,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
        warn!(
            request_id,
            status = status.as_u16(),
            error = %self,
            "request failed"
        );

        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "status_code": status.as_u16(),
            "request_id": request_id,
            "reauthorize": self.reauthorize(),
        });
        let mut response = (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response();

        if let Some(retry_after) = self.retry_after() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after.as_secs()));
        }
        response
    }
}
