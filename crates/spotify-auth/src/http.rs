//! HTTP client for provider calls

use std::time::Duration;

/// Build the client used for token and Web API requests.
///
/// Redirects are never followed. `require_secure` only sees the configured
/// endpoint, and a 307/308 would re-send the grant form (authorization code,
/// client credentials) to whatever `Location` names. A 3xx comes back to the
/// caller as a failed response instead.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
}
