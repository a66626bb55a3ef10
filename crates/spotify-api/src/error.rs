//! Error types for authenticated resource calls

use std::fmt;
use std::time::Duration;

/// What went wrong with a resource call, independent of the message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// 401: the access token is expired or revoked. Never retry with the same token.
    Unauthorized,
    /// 403: the token lacks a scope or the user may not access the resource.
    Forbidden,
    /// 429: back off for `retry_after` when the provider says how long.
    RateLimited { retry_after: Option<Duration> },
    /// 5xx, transport failure or timeout.
    UpstreamUnavailable,
    /// Any other 4xx.
    Rejected,
    /// 2xx whose body is not the JSON we expected.
    MalformedResponse,
}

impl ApiErrorKind {
    /// 429 and upstream unavailability are the only transient failures.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiErrorKind::RateLimited { .. } | ApiErrorKind::UpstreamUnavailable
        )
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Unauthorized => f.write_str("unauthorized"),
            ApiErrorKind::Forbidden => f.write_str("forbidden"),
            ApiErrorKind::RateLimited {
                retry_after: Some(d),
            } => write!(f, "rate limited (retry after {}s)", d.as_secs()),
            ApiErrorKind::RateLimited { retry_after: None } => f.write_str("rate limited"),
            ApiErrorKind::UpstreamUnavailable => f.write_str("upstream unavailable"),
            ApiErrorKind::Rejected => f.write_str("rejected"),
            ApiErrorKind::MalformedResponse => f.write_str("malformed response"),
        }
    }
}

/// A failed resource call.
///
/// `status` is the provider's HTTP status, absent for transport failures.
/// `message` is the provider's error message when it sent a recognised error
/// body; it never contains the access token.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    pub(crate) fn transport(e: reqwest::Error) -> Self {
        let e = e.without_url();
        let message = if e.is_timeout() {
            format!("resource API timed out: {e}")
        } else {
            format!("resource API unreachable: {e}")
        };
        Self::new(ApiErrorKind::UpstreamUnavailable, None, message)
    }

    pub(crate) fn malformed(status: Option<u16>, detail: impl fmt::Display) -> Self {
        Self::new(
            ApiErrorKind::MalformedResponse,
            status,
            format!("unexpected response body: {detail}"),
        )
    }

    pub fn kind(&self) -> &ApiErrorKind {
        &self.kind
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Provider-requested backoff, if this was a 429 carrying `Retry-After`.
    pub fn retry_after(&self) -> Option<Duration> {
        match self.kind {
            ApiErrorKind::RateLimited { retry_after } => retry_after,
            _ => None,
        }
    }

    /// HTTP status a collaborator should answer with for this failure.
    pub fn status_code(&self) -> u16 {
        match self.kind {
            ApiErrorKind::Unauthorized => 401,
            ApiErrorKind::Forbidden => 403,
            ApiErrorKind::RateLimited { .. } => 429,
            ApiErrorKind::UpstreamUnavailable => match self.status {
                Some(_) => 502,
                None => 504,
            },
            ApiErrorKind::Rejected => self
                .status
                .filter(|s| (400..500).contains(s))
                .unwrap_or(400),
            ApiErrorKind::MalformedResponse => 500,
        }
    }
}
