//! Anti-CSRF state and the authorization URL
//!
//! A fresh state value is minted for every login attempt and travels to the
//! provider inside the authorization URL. The provider hands it back on the
//! callback, where it must match the value the caller stored out-of-band
//! before any code exchange is attempted. Nothing here holds state between
//! calls.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use url::Url;

use crate::constants::STATE_BYTES;
use crate::scope::{self, Scope};

/// Generate an unguessable state value for one login attempt.
///
/// 32 random bytes encoded as URL-safe base64 without padding (43 characters).
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare the callback state with the stored one.
///
/// Runs in time independent of where the first differing byte sits. A length
/// mismatch returns false immediately (the length is not secret).
pub fn validate_state(received: &str, expected: &str) -> bool {
    if received.len() != expected.len() {
        return false;
    }
    received
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Build the consent-screen URL.
///
/// Parameters are form-encoded by `url`, so the redirect URI and the
/// space-joined scope list come back unchanged when the query is parsed.
pub fn build_authorization_url(
    authorize_endpoint: &Url,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[Scope],
    state: &str,
) -> String {
    authorization_url(authorize_endpoint, client_id, redirect_uri, scopes, state, false)
        .to_string()
}

/// Same as `build_authorization_url`, optionally asking the provider to show
/// the consent dialog again. Existing query pairs and any fragment on the
/// endpoint are preserved.
pub(crate) fn authorization_url(
    authorize_endpoint: &Url,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[Scope],
    state: &str,
    show_dialog: bool,
) -> Url {
    let mut url = authorize_endpoint.clone();
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &scope::join(scopes))
            .append_pair("state", state);
        if show_dialog {
            query.append_pair("show_dialog", "true");
        }
    }
    url
}
