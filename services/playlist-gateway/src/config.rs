//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults. A missing config file
//! is not an error; every section has defaults and the client credentials
//! usually arrive through the environment (or a `.env` file loaded by main).
//! The client secret is loaded from the CLIENT_SECRET env var or
//! `client_secret_file`, never stored in the TOML directly.

use common::Secret;
use serde::Deserialize;
use spotify_api::RetryPolicy;
use spotify_auth::{
    API_BASE_URL, AUTHORIZE_ENDPOINT, ClientAuth, ClientConfig, Endpoints, Scope, TOKEN_ENDPOINT,
};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub spotify: SpotifyConfig,
    pub resource: ResourceConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Timeout for every call to the provider, in seconds.
    pub timeout_secs: u64,
    pub max_connections: usize,
    /// How long a login may stay pending before its state is discarded.
    pub state_ttl_secs: u64,
    /// Upper bound on pending logins; the oldest is dropped when a new one would exceed it.
    pub max_pending_logins: usize,
    /// Mark the state cookie `Secure`. Off by default so the loopback redirect works.
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            timeout_secs: 10,
            max_connections: 256,
            state_ttl_secs: 600,
            max_pending_logins: 10_000,
            secure_cookies: false,
        }
    }
}

/// Client registration and provider endpoints
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to CLIENT_SECRET env var)
    pub client_secret_file: Option<PathBuf>,
    pub redirect_uri: String,
    pub scopes: Vec<Scope>,
    pub show_dialog: bool,
    pub client_auth: ClientAuth,
    pub authorize_url: String,
    pub token_url: String,
    pub api_base_url: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            client_secret_file: None,
            redirect_uri: "http://127.0.0.1:8000/auth/callback".to_string(),
            scopes: Scope::ALL.to_vec(),
            show_dialog: true,
            client_auth: ClientAuth::default(),
            authorize_url: AUTHORIZE_ENDPOINT.to_string(),
            token_url: TOKEN_ENDPOINT.to_string(),
            api_base_url: API_BASE_URL.to_string(),
        }
    }
}

/// Resource call behaviour
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Total attempts per resource call, including the first.
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    /// Longest wait the gateway accepts, including a provider `Retry-After`.
    pub retry_max_delay_secs: u64,
    /// Page size used when `/resource/playlists` gets no `limit`.
    pub playlist_limit: u32,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_base_delay_ms: 200,
            retry_max_delay_secs: 10,
            playlist_limit: 50,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file (defaults if absent), then overlay
    /// environment variables.
    ///
    /// Client secret resolution order:
    /// 1. CLIENT_SECRET (or SPOTIFY_CLIENT_SECRET) env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let mut config: Config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(e.into()),
        };

        if let Some(id) = first_env(&["CLIENT_ID", "SPOTIFY_CLIENT_ID"]) {
            config.spotify.client_id = id;
        }
        if let Some(uri) = first_env(&["REDIRECT_URI", "SPOTIFY_REDIRECT_URI"]) {
            config.spotify.redirect_uri = uri;
        }

        if let Some(secret) = first_env(&["CLIENT_SECRET", "SPOTIFY_CLIENT_SECRET"]) {
            config.spotify.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.spotify.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.spotify.client_secret = Some(Secret::new(secret));
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if self.server.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }
        if self.server.state_ttl_secs == 0 {
            return Err(common::Error::Config(
                "state_ttl_secs must be greater than 0".into(),
            ));
        }
        if self.server.max_pending_logins == 0 {
            return Err(common::Error::Config(
                "max_pending_logins must be greater than 0".into(),
            ));
        }
        if self.resource.retry_attempts == 0 {
            return Err(common::Error::Config(
                "retry_attempts must be greater than 0".into(),
            ));
        }
        if self.resource.playlist_limit == 0 {
            return Err(common::Error::Config(
                "playlist_limit must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Build and validate the client configuration handed to every token operation.
    pub fn client_config(&self) -> common::Result<ClientConfig> {
        let spotify = &self.spotify;
        let endpoints = Endpoints::parse(
            &spotify.authorize_url,
            &spotify.token_url,
            &spotify.api_base_url,
        )?;
        let client = ClientConfig {
            client_id: spotify.client_id.trim().to_string(),
            client_secret: spotify
                .client_secret
                .clone()
                .unwrap_or_else(|| Secret::new(String::new())),
            redirect_uri: spotify.redirect_uri.trim().to_string(),
            scopes: spotify.scopes.clone(),
            endpoints,
            client_auth: spotify.client_auth,
            show_dialog: spotify.show_dialog,
        };
        client.validate()?;
        Ok(client)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs)
    }

    pub fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.server.state_ttl_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.resource.retry_attempts,
            base_delay: Duration::from_millis(self.resource.retry_base_delay_ms),
            max_delay: Duration::from_secs(self.resource.retry_max_delay_secs),
        }
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("playlist-gateway.toml")
    }
}

/// First non-blank value among `keys`.
fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const CREDENTIAL_VARS: &[&str] = &[
        "CLIENT_ID",
        "CLIENT_SECRET",
        "REDIRECT_URI",
        "SPOTIFY_CLIENT_ID",
        "SPOTIFY_CLIENT_SECRET",
        "SPOTIFY_REDIRECT_URI",
    ];

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    /// SAFETY: Callers must hold ENV_MUTEX.
    unsafe fn clear_credential_env() {
        for key in CREDENTIAL_VARS {
            unsafe { remove_env(key) };
        }
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("playlist-gateway.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn valid_toml() -> &'static str {
        r#"
[server]
listen_addr = "0.0.0.0:9000"
max_connections = 64

[spotify]
client_id = "toml-client-id"
redirect_uri = "https://playlists.example.com/auth/callback"
scopes = ["playlist-read-private", "user-read-email"]
show_dialog = false
client_auth = "body"

[resource]
retry_attempts = 2
playlist_limit = 20
"#
    }

    #[test]
    fn test_load_valid_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_credential_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.listen_addr.port(), 9000);
        assert_eq!(config.server.max_connections, 64);
        assert_eq!(config.server.timeout_secs, 10);
        assert_eq!(config.server.state_ttl_secs, 600);
        assert_eq!(config.server.max_pending_logins, 10_000);
        assert_eq!(config.spotify.client_id, "toml-client-id");
        assert_eq!(
            config.spotify.scopes,
            vec![Scope::PlaylistReadPrivate, Scope::UserReadEmail]
        );
        assert!(!config.spotify.show_dialog);
        assert_eq!(config.spotify.client_auth, ClientAuth::Body);
        assert_eq!(config.resource.retry_attempts, 2);
        assert_eq!(config.resource.playlist_limit, 20);
        assert!(config.spotify.client_secret.is_none());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_credential_env() };
        let dir = tempfile::tempdir().unwrap();

        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.listen_addr.to_string(), "127.0.0.1:8000");
        assert_eq!(config.spotify.scopes, Scope::ALL.to_vec());
        assert!(config.spotify.show_dialog);
        assert_eq!(config.spotify.token_url, TOKEN_ENDPOINT);
        assert_eq!(config.resource.retry_attempts, 3);
    }

    #[test]
    fn test_load_invalid_toml() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_unknown_scope_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[spotify]
scopes = ["playlist-read-private", "user-library-modify"]
"#,
        );
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_credential_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        unsafe {
            set_env("CLIENT_ID", "env-client-id");
            set_env("CLIENT_SECRET", "env-secret");
            set_env("REDIRECT_URI", "http://localhost:8000/auth/callback");
        }
        let config = Config::load(&path).unwrap();
        unsafe { clear_credential_env() };

        assert_eq!(config.spotify.client_id, "env-client-id");
        assert_eq!(
            config.spotify.redirect_uri,
            "http://localhost:8000/auth/callback"
        );
        assert_eq!(
            config.spotify.client_secret.as_ref().unwrap().expose(),
            "env-secret"
        );
    }

    #[test]
    fn test_spotify_prefixed_env_names_accepted() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_credential_env() };
        let dir = tempfile::tempdir().unwrap();

        unsafe {
            set_env("SPOTIFY_CLIENT_ID", "prefixed-id");
            set_env("SPOTIFY_CLIENT_SECRET", "prefixed-secret");
        }
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        unsafe { clear_credential_env() };

        assert_eq!(config.spotify.client_id, "prefixed-id");
        assert_eq!(
            config.spotify.client_secret.as_ref().unwrap().expose(),
            "prefixed-secret"
        );
    }

    #[test]
    fn test_client_secret_from_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_credential_env() };
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("client_secret");
        std::fs::write(&secret_path, "file-secret\n").unwrap();
        let path = write_config(
            &dir,
            &format!(
                r#"
[spotify]
client_id = "id"
client_secret_file = "{}"
"#,
                secret_path.display()
            ),
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.spotify.client_secret.as_ref().unwrap().expose(),
            "file-secret"
        );
    }

    #[test]
    fn test_env_secret_overrides_nonexistent_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_credential_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[spotify]
client_secret_file = "/nonexistent/path/client_secret"
"#,
        );

        unsafe { set_env("CLIENT_SECRET", "env-wins") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("CLIENT_SECRET") };
        assert_eq!(
            config.spotify.client_secret.as_ref().unwrap().expose(),
            "env-wins"
        );
    }

    #[test]
    fn test_nonexistent_secret_file_returns_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_credential_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[spotify]
client_secret_file = "/nonexistent/path/client_secret"
"#,
        );
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_credential_env() };
        let dir = tempfile::tempdir().unwrap();
        for (section, key) in [
            ("server", "timeout_secs"),
            ("server", "max_connections"),
            ("server", "state_ttl_secs"),
            ("server", "max_pending_logins"),
            ("resource", "retry_attempts"),
            ("resource", "playlist_limit"),
        ] {
            let path = write_config(&dir, &format!("[{section}]\n{key} = 0\n"));
            let err = Config::load(&path).unwrap_err();
            assert!(
                err.to_string().contains(key),
                "{key} = 0 must be rejected, got: {err}"
            );
        }
    }

    #[test]
    fn test_client_config_requires_credentials() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_credential_env() };
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();

        let err = config.client_config().unwrap_err();
        assert!(
            matches!(err, common::Error::MissingSetting("CLIENT_ID")),
            "got: {err:?}"
        );
    }

    #[test]
    fn test_client_config_built_from_sections() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_credential_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        unsafe { set_env("CLIENT_SECRET", "s3cret") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("CLIENT_SECRET") };

        let client = config.client_config().unwrap();
        assert_eq!(client.client_id, "toml-client-id");
        assert_eq!(client.client_auth, ClientAuth::Body);
        assert!(!client.show_dialog);
        assert_eq!(client.endpoints.token.as_str(), TOKEN_ENDPOINT);
        assert!(!format!("{client:?}").contains("s3cret"));
    }

    #[test]
    fn test_plaintext_provider_endpoint_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_credential_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[spotify]
client_id = "id"
token_url = "http://accounts.example.com/api/token"
"#,
        );

        unsafe { set_env("CLIENT_SECRET", "s") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("CLIENT_SECRET") };

        let err = config.client_config().unwrap_err();
        assert!(
            matches!(err, common::Error::InsecureEndpoint { name: "token_url", .. }),
            "got: {err:?}"
        );
    }

    #[test]
    fn test_retry_policy_from_resource_section() {
        let config = Config::default();
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(200));
        assert_eq!(policy.max_delay, Duration::from_secs(10));
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let path = Config::resolve_path(Some("/custom/path.toml"));
        assert_eq!(path, PathBuf::from("/custom/path.toml"));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("/env/path.toml"));
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("playlist-gateway.toml"));
    }
}
