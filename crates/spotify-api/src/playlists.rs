//! Current user's playlists (`GET /me/playlists`)
//!
//! Playlist objects are passed through untouched; only the paging fields are
//! read.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ResourceClient;
use crate::error::ApiError;

/// Largest page the provider serves.
pub const MAX_PLAYLIST_LIMIT: u32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistPage {
    pub items: Vec<Value>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub next: Option<String>,
}

/// Clamp a requested page size into `1..=50`.
pub fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_PLAYLIST_LIMIT)
}

impl ResourceClient {
    pub async fn current_user_playlists(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<PlaylistPage, ApiError> {
        let limit = clamp_limit(limit).to_string();
        let value = self
            .call(Method::GET, "/me/playlists", access_token, &[("limit", limit.as_str())])
            .await?;
        serde_json::from_value(value).map_err(|e| ApiError::malformed(Some(200), e))
    }
}
