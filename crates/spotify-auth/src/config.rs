//! Client configuration consumed by every token operation
//!
//! `ClientConfig` is built and validated once at startup by the caller and then
//! passed by reference into each operation. The core never reads the
//! environment itself.

use std::net::IpAddr;

use common::Secret;
use serde::Deserialize;
use url::{Host, Url};

use crate::constants::{API_BASE_URL, AUTHORIZE_ENDPOINT, TOKEN_ENDPOINT};
use crate::scope::Scope;
use crate::state::authorization_url;

/// How client credentials reach the token endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientAuth {
    /// `Authorization: Basic base64(client_id:client_secret)`
    #[default]
    Basic,
    /// `client_id` and `client_secret` as form parameters
    Body,
}

/// Provider endpoints. All three are checked by `require_secure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorize: Url,
    pub token: Url,
    pub resource_base: Url,
}

impl Endpoints {
    /// Parse and validate a set of endpoint URLs.
    pub fn parse(authorize: &str, token: &str, resource_base: &str) -> common::Result<Self> {
        let endpoints = Self {
            authorize: parse_url("authorize_url", authorize)?,
            token: parse_url("token_url", token)?,
            resource_base: parse_url("api_base_url", resource_base)?,
        };
        endpoints.validate()?;
        Ok(endpoints)
    }

    /// The public Spotify endpoints.
    pub fn spotify() -> common::Result<Self> {
        Self::parse(AUTHORIZE_ENDPOINT, TOKEN_ENDPOINT, API_BASE_URL)
    }

    pub fn validate(&self) -> common::Result<()> {
        require_secure("authorize_url", &self.authorize)?;
        require_secure("token_url", &self.token)?;
        require_secure("api_base_url", &self.resource_base)
    }
}

fn parse_url(name: &'static str, raw: &str) -> common::Result<Url> {
    Url::parse(raw).map_err(|e| common::Error::Config(format!("{name} is not a valid URL ({raw}): {e}")))
}

/// Refuse plaintext HTTP towards the provider.
///
/// `https` is always accepted. `http` is accepted only for loopback hosts
/// (`localhost`, `127.0.0.0/8`, `::1`), which is where local provider stubs run.
pub fn require_secure(name: &'static str, url: &Url) -> common::Result<()> {
    match url.scheme() {
        "https" => Ok(()),
        "http" if is_loopback(url) => Ok(()),
        _ => Err(common::Error::InsecureEndpoint {
            name,
            url: url.to_string(),
        }),
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
        Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
        None => false,
    }
}

/// Everything a token or authorization operation needs to know about this client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
    pub scopes: Vec<Scope>,
    pub endpoints: Endpoints,
    pub client_auth: ClientAuth,
    /// Force the consent dialog even if the user already approved this client.
    pub show_dialog: bool,
}

impl ClientConfig {
    /// Check required fields. Called once at startup.
    pub fn validate(&self) -> common::Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(common::Error::MissingSetting("CLIENT_ID"));
        }
        if self.client_secret.expose().trim().is_empty() {
            return Err(common::Error::MissingSetting("CLIENT_SECRET"));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(common::Error::MissingSetting("REDIRECT_URI"));
        }
        Url::parse(&self.redirect_uri).map_err(|e| {
            common::Error::Config(format!(
                "REDIRECT_URI is not a valid URL ({}): {e}",
                self.redirect_uri
            ))
        })?;
        if self.scopes.is_empty() {
            return Err(common::Error::Config("scopes must not be empty".into()));
        }
        self.endpoints.validate()
    }

    /// Consent-screen URL for one login attempt, using the configured client values.
    pub fn authorization_url(&self, state: &str) -> String {
        authorization_url(
            &self.endpoints.authorize,
            &self.client_id,
            &self.redirect_uri,
            &self.scopes,
            state,
            self.show_dialog,
        )
        .to_string()
    }
}
