//! Spotify OAuth authorization-code library
//!
//! Provides state generation, authorization URL building, and token
//! exchange/refresh against the Spotify accounts service. This crate holds no
//! state between calls and never reads the environment; the caller builds a
//! `ClientConfig` once and owns every token it gets back.
//!
//! Login flow:
//! 1. Caller mints `state::generate_state()` and stores it out-of-band
//! 2. User is redirected to `ClientConfig::authorization_url()`
//! 3. Callback state is checked with `state::validate_state()`
//! 4. `token::exchange_code()` trades the code for a `TokenSet`
//! 5. `token::refresh_token()` renews the access token when it expires
//!
//! Every call takes a `reqwest::Client` from the caller. Build it with
//! `http::http_client()` so provider redirects are never followed.

pub mod config;
pub mod constants;
pub mod error;
pub mod http;
pub mod provider_error;
pub mod scope;
pub mod state;
pub mod token;

pub use config::{ClientAuth, ClientConfig, Endpoints, require_secure};
pub use constants::*;
pub use error::{Error, Result};
pub use http::http_client;
pub use provider_error::provider_message;
pub use scope::Scope;
pub use state::{build_authorization_url, generate_state, validate_state};
pub use token::{TokenSet, exchange_code, refresh_token};
