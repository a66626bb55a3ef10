//! Spotify OAuth constants
//!
//! Public endpoints of the Spotify accounts service and Web API. These are the
//! defaults for `Endpoints::spotify()`; deployments may point them elsewhere
//! (e.g. a local stub) through configuration.

/// Authorization endpoint (consent screen)
pub const AUTHORIZE_ENDPOINT: &str = "https://accounts.spotify.com/authorize";

/// Token endpoint for code exchange and token refresh
pub const TOKEN_ENDPOINT: &str = "https://accounts.spotify.com/api/token";

/// Base URL of the Web API used for authenticated resource calls
pub const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Random bytes behind each authorization state value.
/// Encoded as unpadded URL-safe base64 this yields 43 characters.
pub const STATE_BYTES: usize = 32;
