//! Current user profile (`GET /me`)

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ResourceClient;
use crate::error::ApiError;

/// Read-only projection of the `/me` response. Fetched once per login, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Only present with the `user-read-email` scope.
    #[serde(default)]
    pub email: Option<String>,
    /// Only present with the `user-read-private` scope.
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub followers: Option<Value>,
    #[serde(default)]
    pub images: Option<Value>,
}

impl ResourceClient {
    pub async fn current_user(&self, access_token: &str) -> Result<UserProfile, ApiError> {
        let value = self.call(Method::GET, "/me", access_token, &[]).await?;
        serde_json::from_value(value).map_err(|e| ApiError::malformed(Some(200), e))
    }
}
