//! Provider stub and app state shared by the handler tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post};
use common::Secret;
use spotify_api::{ResourceClient, RetryPolicy};
use spotify_auth::{ClientAuth, ClientConfig, Endpoints, Scope};
use url::Url;

use crate::AppState;
use crate::session::{PendingStates, RefreshGuard};

/// Fake accounts service + Web API on one loopback listener.
///
/// - `POST /api/token`: code `good-code` or refresh token `good-refresh` are
///   granted, anything else is `invalid_grant`
/// - `GET /v1/me`, `GET /v1/me/playlists`: bearer `good-access` succeeds,
///   `rate-limited` gets 429 with `Retry-After: 7`, anything else 401
pub struct ProviderStub {
    pub base_url: String,
    pub token_hits: Arc<AtomicUsize>,
    pub api_hits: Arc<AtomicUsize>,
    /// Form bodies received by the token endpoint, in order.
    pub token_forms: Arc<Mutex<Vec<String>>>,
}

impl ProviderStub {
    pub async fn start() -> Self {
        Self::start_with_token_delay(Duration::ZERO).await
    }

    pub async fn start_with_token_delay(delay: Duration) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let token_hits = Arc::new(AtomicUsize::new(0));
        let api_hits = Arc::new(AtomicUsize::new(0));
        let token_forms = Arc::new(Mutex::new(Vec::new()));

        let token = {
            let token_hits = token_hits.clone();
            let token_forms = token_forms.clone();
            move |form: String| {
                let token_hits = token_hits.clone();
                let token_forms = token_forms.clone();
                async move {
                    token_hits.fetch_add(1, Ordering::SeqCst);
                    token_forms.lock().unwrap().push(form.clone());
                    tokio::time::sleep(delay).await;
                    token_response(&form)
                }
            }
        };

        let me = {
            let api_hits = api_hits.clone();
            move |headers: HeaderMap| {
                let api_hits = api_hits.clone();
                async move {
                    api_hits.fetch_add(1, Ordering::SeqCst);
                    api_response(
                        &headers,
                        serde_json::json!({
                            "id": "stub-user",
                            "display_name": "Stub User",
                            "email": "stub@example.com",
                            "country": "SE",
                            "product": "premium"
                        }),
                    )
                }
            }
        };

        let playlists = {
            let api_hits = api_hits.clone();
            move |headers: HeaderMap| {
                let api_hits = api_hits.clone();
                async move {
                    api_hits.fetch_add(1, Ordering::SeqCst);
                    api_response(
                        &headers,
                        serde_json::json!({
                            "items": [
                                {"id": "p1", "name": "Road Trip"},
                                {"id": "p2", "name": "Focus"}
                            ],
                            "total": 2,
                            "next": null
                        }),
                    )
                }
            }
        };

        let app = axum::Router::new()
            .route("/api/token", post(token))
            .route("/v1/me", get(me))
            .route("/v1/me/playlists", get(playlists));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            token_hits,
            api_hits,
            token_forms,
        }
    }

    pub fn token_hits(&self) -> usize {
        self.token_hits.load(Ordering::SeqCst)
    }
}

fn token_response(form: &str) -> (StatusCode, axum::Json<serde_json::Value>) {
    let params: std::collections::HashMap<String, String> =
        url::form_urlencoded::parse(form.as_bytes()).into_owned().collect();
    let granted = match params.get("grant_type").map(String::as_str) {
        Some("authorization_code") => params.get("code").map(String::as_str) == Some("good-code"),
        Some("refresh_token") => {
            params.get("refresh_token").map(String::as_str) == Some("good-refresh")
        }
        _ => false,
    };

    if !granted {
        return (
            StatusCode::BAD_REQUEST,
            axum::Json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid authorization code"
            })),
        );
    }

    let mut body = serde_json::json!({
        "access_token": "good-access",
        "token_type": "Bearer",
        "expires_in": 3600,
        "scope": "playlist-read-private user-read-email"
    });
    // Refresh responses do not rotate the refresh token.
    if params.get("grant_type").map(String::as_str) == Some("authorization_code") {
        body["refresh_token"] = serde_json::json!("good-refresh");
    }
    (StatusCode::OK, axum::Json(body))
}

fn api_response(
    headers: &HeaderMap,
    body: serde_json::Value,
) -> (StatusCode, HeaderMap, axum::Json<serde_json::Value>) {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let mut response_headers = HeaderMap::new();
    match bearer {
        Some("good-access") => (StatusCode::OK, response_headers, axum::Json(body)),
        Some("rate-limited") => {
            response_headers.insert(header::RETRY_AFTER, "7".parse().unwrap());
            (
                StatusCode::TOO_MANY_REQUESTS,
                response_headers,
                axum::Json(serde_json::json!({
                    "error": {"status": 429, "message": "API rate limit exceeded"}
                })),
            )
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            response_headers,
            axum::Json(serde_json::json!({
                "error": {"status": 401, "message": "The access token expired"}
            })),
        ),
    }
}

pub fn test_client_config(base_url: &str) -> ClientConfig {
    ClientConfig {
        client_id: "test-client".into(),
        client_secret: Secret::new("test-secret".into()),
        redirect_uri: "http://127.0.0.1:8000/auth/callback".into(),
        scopes: vec![Scope::PlaylistReadPrivate, Scope::UserReadEmail],
        endpoints: Endpoints::parse(
            &format!("{base_url}/authorize"),
            &format!("{base_url}/api/token"),
            &format!("{base_url}/v1"),
        )
        .unwrap(),
        client_auth: ClientAuth::Basic,
        show_dialog: true,
    }
}

/// App state wired to a provider stub at `base_url`, with an isolated Prometheus
/// handle (no global recorder) and a retry policy that never sleeps long.
pub fn test_app_state(base_url: &str) -> AppState {
    let client = test_client_config(base_url);
    let http = spotify_auth::http_client(Duration::from_secs(5)).unwrap();
    let resource = ResourceClient::new(http.clone(), Url::parse(&format!("{base_url}/v1")).unwrap())
        .unwrap();
    let prometheus = metrics_exporter_prometheus::PrometheusBuilder::new()
        .build_recorder()
        .handle();

    AppState {
        client: Arc::new(client),
        http,
        resource,
        pending: PendingStates::new(Duration::from_secs(600), 1_000),
        refreshes: RefreshGuard::default(),
        retry: RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
        },
        playlist_limit: 50,
        state_ttl: Duration::from_secs(600),
        secure_cookies: false,
        started_at: Instant::now(),
        prometheus,
    }
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
