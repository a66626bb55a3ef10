//! Status classification for Web API responses
//!
//! Maps a non-2xx status to an `ApiErrorKind`. 429 is the only retryable 4xx;
//! 5xx is treated as the provider being temporarily unavailable.

use std::time::Duration;

use crate::error::ApiErrorKind;

/// Classify a non-success status. `retry_after` is only kept for 429.
pub fn classify_status(status: u16, retry_after: Option<Duration>) -> ApiErrorKind {
    match status {
        401 => ApiErrorKind::Unauthorized,
        403 => ApiErrorKind::Forbidden,
        429 => ApiErrorKind::RateLimited { retry_after },
        500..=599 => ApiErrorKind::UpstreamUnavailable,
        _ => ApiErrorKind::Rejected,
    }
}

/// Parse a `Retry-After` header given in delta-seconds.
///
/// The HTTP-date form is not used by this provider and yields `None`.
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value?.trim().parse::<u64>().ok().map(Duration::from_secs)
}
