//! Authenticated Spotify Web API client
//!
//! Attaches a caller-owned access token to each request and classifies the
//! result so the caller can decide what to do next:
//! - `Unauthorized` → refresh the token (spotify-auth) or re-authorize
//! - `RateLimited` / `UpstreamUnavailable` → back off, optionally via `retry::call_with_retry`
//! - `Forbidden` / `Rejected` → give up
//!
//! The client holds no token state and never retries on its own.

pub mod classify;
pub mod client;
pub mod error;
pub mod playlists;
pub mod profile;
pub mod retry;

#[cfg(test)]
mod testing;

pub use classify::{classify_status, parse_retry_after};
pub use client::ResourceClient;
pub use error::{ApiError, ApiErrorKind};
pub use playlists::{MAX_PLAYLIST_LIMIT, PlaylistPage, clamp_limit};
pub use profile::UserProfile;
pub use retry::{RetryPolicy, call_with_retry};

pub use reqwest::Method;
