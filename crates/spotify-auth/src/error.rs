//! Error types for OAuth authentication operations

/// Errors from the authorization flow and the token endpoint.
///
/// None of these are retried by this crate. Messages carry the provider's
/// `error`/`error_description` text but never a token or the client secret.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("state mismatch: callback state does not match the pending login")]
    StateMismatch,

    #[error("token exchange rejected ({status}): {message}")]
    Exchange { status: u16, message: String },

    #[error("token refresh rejected ({status}): {message}")]
    Refresh { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error(transparent)]
    Config(#[from] common::Error),
}

impl Error {
    /// HTTP status a collaborator should answer with for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::StateMismatch => 400,
            Error::Exchange { status: 401, .. } => 401,
            Error::Exchange { status, .. } if (400..500).contains(status) => 400,
            Error::Exchange { .. } => 502,
            Error::Refresh { .. } => 401,
            Error::MalformedResponse(_) => 500,
            Error::Http(_) => 502,
            Error::Timeout(_) => 504,
            Error::Config(_) => 500,
        }
    }

    /// Whether the only way forward is a fresh authorization from the consent screen.
    pub fn requires_reauthorization(&self) -> bool {
        matches!(
            self,
            Error::StateMismatch | Error::Exchange { .. } | Error::Refresh { .. }
        )
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
